//! HCL source normalization

use crate::error::{Result, ThreatclError};
use hcl::eval::{Context, Evaluate};
use hcl::Body;
use serde_json::{Map, Value};
use std::path::Path;

/// Parse HCL text and convert it into the shared JSON tree
pub(super) fn to_tree(content: &str, path: &Path) -> Result<Value> {
    let body = hcl::parse(content)
        .map_err(|e| ThreatclError::parse(path, format!("invalid HCL: {}", e)))?;
    let ctx = Context::new();
    body_to_map(&body, &ctx, path).map(Value::Object)
}

fn body_to_map(body: &Body, ctx: &Context, path: &Path) -> Result<Map<String, Value>> {
    let mut map = Map::new();

    for attr in body.attributes() {
        let value = attr.expr().evaluate(ctx).map_err(|e| {
            ThreatclError::parse(path, format!("attribute `{}`: {}", attr.key(), e))
        })?;
        let json = serde_json::to_value(&value)?;
        if map.insert(attr.key().to_string(), json).is_some() {
            return Err(ThreatclError::parse(
                path,
                format!("attribute `{}` is defined more than once", attr.key()),
            ));
        }
    }

    for block in body.blocks() {
        let ident = block.identifier();
        let mut object = body_to_map(block.body(), ctx, path)?;

        match block.labels() {
            [] => {}
            [label] => {
                object.insert("name".to_string(), Value::String(label.as_str().to_string()));
            }
            _ => {
                return Err(ThreatclError::parse(
                    path,
                    format!("block `{}` takes at most one label", ident),
                ))
            }
        }

        let entry = map
            .entry(ident.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(Value::Object(object)),
            _ => {
                return Err(ThreatclError::parse(
                    path,
                    format!("`{}` is used both as an attribute and a block", ident),
                ))
            }
        }
    }

    Ok(map)
}
