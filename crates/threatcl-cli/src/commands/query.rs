//! Query command

use super::{Context, SilentExit};
use crate::app::QueryArgs;
use crate::output::render_envelope;
use anyhow::{bail, Context as _, Result};
use serde_json::{Map, Value};
use std::io::Read;
use threatcl_core::{QueryEngine, QueryRequest};

pub async fn run(args: QueryArgs, ctx: &Context) -> Result<()> {
    let query = read_query(&args)?;
    let variables = args.vars.as_deref().map(parse_variables).transpose()?;

    let store = ctx.load_store()?;
    let engine = QueryEngine::new(store);

    let mut request = QueryRequest::new(query);
    if let Some(variables) = variables {
        request = request.with_variables(variables);
    }
    if let Some(operation) = args.operation {
        request = request.with_operation_name(operation);
    }

    let response = engine.execute(&request);
    println!("{}", render_envelope(&response, args.output)?);

    if !response.is_ok() {
        return Err(SilentExit(1).into());
    }
    Ok(())
}

fn read_query(args: &QueryArgs) -> Result<String> {
    let query = match (&args.query, &args.file) {
        (Some(_), Some(_)) => bail!("pass the query either inline or with --file, not both"),
        (Some(query), None) => query.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read query file {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read query from stdin")?;
            buffer
        }
    };
    if query.trim().is_empty() {
        bail!("query is empty");
    }
    Ok(query)
}

fn parse_variables(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--vars is not valid JSON")? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => bail!("--vars must be a JSON object, got {}", kind(&other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variables() {
        let vars = parse_variables(r#"{"name": "Alpha"}"#).unwrap();
        assert_eq!(vars["name"], "Alpha");
        assert!(parse_variables("null").unwrap().is_empty());

        let err = parse_variables("[1]").unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(parse_variables("{nope").is_err());
    }
}
