//! GraphQL-over-HTTP request decoding

use serde::Deserialize;
use serde_json::{Map, Value};
use threatcl_core::QueryRequest;

/// Query-string form of a request: `?query=...&variables=<json>&operationName=...`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParams {
    pub query: Option<String>,
    pub variables: Option<String>,
    pub operation_name: Option<String>,
}

impl GetParams {
    pub fn into_request(self) -> Result<QueryRequest, String> {
        let query = self
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| "Must provide query string.".to_string())?;

        let variables = match self.variables.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_variables(raw)?),
        };

        Ok(QueryRequest {
            query,
            variables,
            operation_name: self.operation_name.filter(|n| !n.is_empty()),
        })
    }
}

fn parse_variables(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err("Variables must be a JSON object.".to_string()),
        Err(e) => Err(format!("Variables are invalid JSON: {e}")),
    }
}

/// Decode a POST body into a request
pub fn decode_body(body: &[u8]) -> Result<QueryRequest, String> {
    let request: QueryRequest =
        serde_json::from_slice(body).map_err(|e| format!("POST body sent invalid JSON: {e}"))?;
    if request.query.trim().is_empty() {
        return Err("Must provide query string.".to_string());
    }
    Ok(request)
}
