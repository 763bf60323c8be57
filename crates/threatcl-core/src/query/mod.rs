//! Read-only GraphQL query engine over the document store
//!
//! Every execution takes one store snapshot and holds it until the whole
//! response is built, so a response never mixes two versions of a file.

mod execute;
mod filter;
mod schema;
mod stats;
mod syntax;

pub use filter::{ThreatModelFilter, FILTER_ARGS};
pub use stats::Stats;
pub use syntax::{parse, Document, Operation, Pos, SyntaxError, TypeRef};

use crate::store::DocumentStore;
use execute::Executor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use syntax::VariableDefinition;
use tracing::debug;

/// A GraphQL request as sent over HTTP or built by the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// One step of a response path: an object key or a list index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Pos>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
        }
    }

    pub fn at(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            locations: Some(vec![pos]),
            path: None,
        }
    }
}

impl From<SyntaxError> for QueryError {
    fn from(err: SyntaxError) -> Self {
        Self::at(format!("Syntax Error: {}", err.message), err.pos)
    }
}

/// The `{data, errors}` envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<QueryError>,
}

impl QueryResponse {
    /// A response that failed before execution: no `data`
    pub fn from_errors(errors: Vec<QueryError>) -> Self {
        Self { data: None, errors }
    }

    pub fn from_error(error: QueryError) -> Self {
        Self::from_errors(vec![error])
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Executes queries against a live store
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<DocumentStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Parse, validate and execute one request. Never panics on bad input;
    /// every failure is reported inside the envelope.
    pub fn execute(&self, request: &QueryRequest) -> QueryResponse {
        let document = match syntax::parse(&request.query) {
            Ok(document) => document,
            Err(err) => return QueryResponse::from_error(err.into()),
        };

        let operation = match select_operation(&document, request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(err) => return QueryResponse::from_error(err),
        };

        let errors = schema::validate(operation);
        if !errors.is_empty() {
            return QueryResponse::from_errors(errors);
        }

        let variables = match coerce_variables(&operation.variables, request.variables.as_ref())
        {
            Ok(variables) => variables,
            Err(errors) => return QueryResponse::from_errors(errors),
        };

        let snapshot = self.store.snapshot();
        let (data, errors) = Executor::new(&snapshot, &variables).run(&operation.selection);
        drop(snapshot);

        debug!(
            operation = operation.name.as_deref().unwrap_or("<anonymous>"),
            errors = errors.len(),
            "executed query"
        );
        QueryResponse {
            data: Some(data),
            errors,
        }
    }
}

fn select_operation<'d>(
    document: &'d Document,
    name: Option<&str>,
) -> Result<&'d Operation, QueryError> {
    let operations = &document.operations;

    if operations.len() > 1 {
        if let Some(anonymous) = operations.iter().find(|op| op.name.is_none()) {
            return Err(QueryError::at(
                "This anonymous operation must be the only defined operation.",
                anonymous.pos,
            ));
        }
        for (i, op) in operations.iter().enumerate() {
            if operations[..i].iter().any(|prev| prev.name == op.name) {
                return Err(QueryError::at(
                    format!(
                        "There can be only one operation named \"{}\".",
                        op.name.as_deref().unwrap_or_default()
                    ),
                    op.pos,
                ));
            }
        }
    }

    match name {
        Some(name) => operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or_else(|| QueryError::new(format!("Unknown operation named \"{name}\"."))),
        None => match operations.as_slice() {
            [only] => Ok(only),
            _ => Err(QueryError::new(
                "Must provide operation name if query contains multiple operations.",
            )),
        },
    }
}

/// Resolve declared variables from the request, applying defaults and
/// checking types
fn coerce_variables(
    definitions: &[VariableDefinition],
    provided: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>, Vec<QueryError>> {
    let mut values = Map::new();
    let mut errors = Vec::new();

    for def in definitions {
        if let Err(message) = check_type_exists(&def.ty) {
            errors.push(QueryError::at(message, def.pos));
            continue;
        }

        let value = match provided.and_then(|vars| vars.get(&def.name)) {
            Some(value) => value.clone(),
            None => match &def.default {
                Some(default) => constant(default),
                None if def.ty.is_non_null() => {
                    errors.push(QueryError::at(
                        format!(
                            "Variable \"${}\" of required type \"{}\" was not provided.",
                            def.name, def.ty
                        ),
                        def.pos,
                    ));
                    continue;
                }
                None => continue,
            },
        };

        match check_input(&def.ty, &value) {
            Ok(()) => {
                values.insert(def.name.clone(), value);
            }
            Err(expected) => errors.push(QueryError::at(
                format!(
                    "Variable \"${}\" got invalid value {value}; {expected}",
                    def.name
                ),
                def.pos,
            )),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

fn check_type_exists(ty: &TypeRef) -> Result<(), String> {
    match ty {
        TypeRef::Named(name) => match name.as_str() {
            "String" | "ID" | "Int" | "Float" | "Boolean" => Ok(()),
            other => Err(format!("Unknown type \"{other}\".")),
        },
        TypeRef::List(inner) | TypeRef::NonNull(inner) => check_type_exists(inner),
    }
}

fn check_input(ty: &TypeRef, value: &Value) -> Result<(), String> {
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return Err(format!("expected non-nullable type \"{ty}\" not to be null"));
            }
            check_input(inner, value)
        }
        _ if value.is_null() => Ok(()),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items.iter().try_for_each(|item| check_input(inner, item)),
            single => check_input(inner, single),
        },
        TypeRef::Named(name) => {
            let ok = match name.as_str() {
                "String" => value.is_string(),
                "ID" => value.is_string() || value.is_i64(),
                "Int" => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
                "Float" => value.is_number(),
                "Boolean" => value.is_boolean(),
                _ => false,
            };
            if ok {
                Ok(())
            } else {
                Err(format!("expected type \"{name}\""))
            }
        }
    }
}

fn constant(value: &syntax::Value) -> Value {
    use syntax::Value as Literal;
    match value {
        Literal::Variable(_) | Literal::Null => Value::Null,
        Literal::Int(v) => Value::from(*v),
        Literal::Float(v) => serde_json::Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Literal::String(s) | Literal::Enum(s) => Value::from(s.as_str()),
        Literal::Boolean(b) => Value::from(*b),
        Literal::List(items) => items.iter().map(constant).collect(),
        Literal::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), constant(v)))
                .collect(),
        ),
    }
}
