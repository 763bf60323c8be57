//! Selection-set execution against one store snapshot

use super::filter::ThreatModelFilter;
use super::schema::{self, QUERY};
use super::stats::Stats;
use super::syntax::{Field, Value as Literal};
use super::{PathSegment, QueryError};
use crate::model::{
    Control, Exclusion, InformationAsset, ModelAttributes, ThirdPartyDependency, Threat,
    ThreatModel, UseCase,
};
use crate::store::Snapshot;
use serde_json::{json, Map, Number, Value};
use std::sync::Arc;

/// An object value the executor can select fields from
#[derive(Debug, Clone)]
enum Node<'a> {
    Query,
    Model(&'a ThreatModel),
    Attributes(&'a ModelAttributes),
    Asset(&'a InformationAsset),
    UseCase(&'a UseCase),
    Exclusion(&'a Exclusion),
    Dependency(&'a ThirdPartyDependency),
    Threat(&'a Threat),
    Control(&'a Control),
    Stats(Arc<Stats>),
    Count {
        type_name: &'static str,
        label: String,
        count: usize,
    },
}

impl Node<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Query => QUERY,
            Self::Model(_) => "ThreatModel",
            Self::Attributes(_) => "Attributes",
            Self::Asset(_) => "InformationAsset",
            Self::UseCase(_) => "UseCase",
            Self::Exclusion(_) => "Exclusion",
            Self::Dependency(_) => "ThirdPartyDependency",
            Self::Threat(_) => "Threat",
            Self::Control(_) => "Control",
            Self::Stats(_) => "Stats",
            Self::Count { type_name, .. } => *type_name,
        }
    }
}

enum Resolved<'a> {
    Leaf(Value),
    Object(Node<'a>),
    List(Vec<Node<'a>>),
    Null,
}

impl<'a> Resolved<'a> {
    fn optional(node: Option<Node<'a>>) -> Self {
        node.map(Self::Object).unwrap_or(Self::Null)
    }

    fn list<T: 'a>(items: &'a [T], wrap: fn(&'a T) -> Node<'a>) -> Self {
        Self::List(items.iter().map(wrap).collect())
    }
}

fn leaf(value: impl Into<Value>) -> Result<Resolved<'static>, String> {
    Ok(Resolved::Leaf(value.into()))
}

fn counts(type_name: &'static str, entries: &[(String, usize)]) -> Vec<Node<'static>> {
    entries
        .iter()
        .map(|(label, count)| Node::Count {
            type_name,
            label: label.clone(),
            count: *count,
        })
        .collect()
}

pub(super) struct Executor<'a> {
    snapshot: &'a Snapshot<'a>,
    variables: &'a Map<String, Value>,
    errors: Vec<QueryError>,
}

impl<'a> Executor<'a> {
    pub(super) fn new(snapshot: &'a Snapshot<'a>, variables: &'a Map<String, Value>) -> Self {
        Self {
            snapshot,
            variables,
            errors: Vec::new(),
        }
    }

    /// Execute the root selection, returning `data` and any field errors
    pub(super) fn run(mut self, selection: &[Field]) -> (Value, Vec<QueryError>) {
        let mut path = Vec::new();
        let data = self.selection(&Node::Query, selection, &mut path);
        (Value::Object(data), self.errors)
    }

    fn selection(
        &mut self,
        node: &Node<'a>,
        fields: &[Field],
        path: &mut Vec<PathSegment>,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for field in fields {
            let key = field.response_key();
            if field.name == "__typename" {
                out.insert(key.to_string(), json!(node.type_name()));
                continue;
            }
            path.push(PathSegment::Key(key.to_string()));
            let value = self.field(node, field, path);
            path.pop();
            out.insert(key.to_string(), value);
        }
        out
    }

    fn field(&mut self, node: &Node<'a>, field: &Field, path: &mut Vec<PathSegment>) -> Value {
        let resolved = self
            .arguments(node, field)
            .and_then(|args| self.resolve(node, &field.name, &args));

        let subfields = field.selection.as_deref().unwrap_or_default();
        match resolved {
            Ok(Resolved::Leaf(value)) => value,
            Ok(Resolved::Null) => Value::Null,
            Ok(Resolved::Object(child)) => Value::Object(self.selection(&child, subfields, path)),
            Ok(Resolved::List(children)) => Value::Array(
                children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        path.push(PathSegment::Index(i));
                        let value = Value::Object(self.selection(child, subfields, path));
                        path.pop();
                        value
                    })
                    .collect(),
            ),
            Err(message) => {
                self.errors.push(QueryError {
                    message,
                    locations: Some(vec![field.pos]),
                    path: Some(path.clone()),
                });
                Value::Null
            }
        }
    }

    /// Check argument names against the schema and substitute variables
    fn arguments(&self, node: &Node<'a>, field: &Field) -> Result<Map<String, Value>, String> {
        let allowed = schema::field_def(node.type_name(), &field.name)
            .map(|def| def.args)
            .unwrap_or_default();

        let mut args = Map::new();
        for (name, value) in &field.arguments {
            if !allowed.contains(&name.as_str()) {
                return Err(format!(
                    "Unknown argument \"{name}\" on field \"{}.{}\".",
                    node.type_name(),
                    field.name
                ));
            }
            args.insert(name.clone(), self.literal(value));
        }
        Ok(args)
    }

    fn literal(&self, value: &Literal) -> Value {
        match value {
            Literal::Variable(name) => self.variables.get(name).cloned().unwrap_or(Value::Null),
            Literal::Int(v) => json!(v),
            Literal::Float(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
            Literal::String(s) | Literal::Enum(s) => json!(s),
            Literal::Boolean(b) => json!(b),
            Literal::Null => Value::Null,
            Literal::List(items) => items.iter().map(|v| self.literal(v)).collect(),
            Literal::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.literal(v)))
                    .collect(),
            ),
        }
    }

    fn resolve(
        &self,
        node: &Node<'a>,
        field: &str,
        args: &Map<String, Value>,
    ) -> Result<Resolved<'a>, String> {
        match node {
            Node::Query => self.resolve_query(field, args),
            Node::Model(m) => resolve_model(*m, field),
            Node::Attributes(a) => match field {
                "newInitiative" => leaf(a.new_initiative),
                "internetFacing" => leaf(a.internet_facing),
                "initiativeSize" => leaf(a.initiative_size.as_str()),
                _ => Ok(Resolved::Null),
            },
            Node::Asset(asset) => match field {
                "name" => leaf(asset.name.as_str()),
                "description" => leaf(asset.description.as_deref()),
                "informationClassification" => leaf(asset.information_classification.as_deref()),
                "source" => leaf(asset.source.as_deref()),
                _ => Ok(Resolved::Null),
            },
            Node::UseCase(u) => leaf(u.description.as_str()),
            Node::Exclusion(e) => leaf(e.description.as_str()),
            Node::Dependency(d) => match field {
                "name" => leaf(d.name.as_str()),
                "description" => leaf(d.description.as_deref()),
                "saas" => leaf(d.saas),
                "payingCustomer" => leaf(d.paying_customer),
                "openSource" => leaf(d.open_source),
                "infrastructure" => leaf(d.infrastructure),
                "uptimeDependency" => leaf(d.uptime_dependency.as_str()),
                "uptimeNotes" => leaf(d.uptime_notes.as_deref()),
                _ => Ok(Resolved::Null),
            },
            Node::Threat(t) => resolve_threat(*t, field),
            Node::Control(c) => match field {
                "name" => leaf(c.name.as_str()),
                "implemented" => leaf(c.implemented),
                "description" => leaf(c.description.as_deref()),
                "implementationNotes" => leaf(c.implementation_notes.as_deref()),
                "riskReduction" => leaf(c.risk_reduction),
                _ => Ok(Resolved::Null),
            },
            Node::Stats(stats) => Ok(resolve_stats(stats, field)),
            Node::Count { label, count, .. } => match field {
                "count" => leaf(*count),
                _ => leaf(label.as_str()),
            },
        }
    }

    fn resolve_query(&self, field: &str, args: &Map<String, Value>) -> Result<Resolved<'a>, String> {
        let snapshot = self.snapshot;
        match field {
            "stats" => Ok(Resolved::Object(Node::Stats(Arc::new(Stats::collect(
                snapshot,
            ))))),
            "threatModels" => {
                let filter = ThreatModelFilter::from_args(args)?;
                Ok(Resolved::List(
                    filter
                        .apply(snapshot.iter())
                        .into_iter()
                        .map(|m| Node::Model(m.as_ref()))
                        .collect(),
                ))
            }
            "threatModel" => {
                let name = args.get("name").and_then(Value::as_str).ok_or_else(|| {
                    "Argument \"name\" of type \"String!\" is required".to_string()
                })?;
                snapshot
                    .get(name)
                    .map(|m| Resolved::Object(Node::Model(m.as_ref())))
                    .ok_or_else(|| format!("threatModel \"{name}\" not found"))
            }
            _ => Ok(Resolved::Null),
        }
    }
}

fn resolve_model<'a>(m: &'a ThreatModel, field: &str) -> Result<Resolved<'a>, String> {
    match field {
        "name" => leaf(m.name.as_str()),
        "sourceFile" => leaf(m.source_file.display().to_string()),
        "author" => leaf(m.author.as_str()),
        "status" => leaf(m.status.as_deref()),
        "description" => leaf(m.description.as_deref()),
        "link" => leaf(m.link.as_deref()),
        "diagramLink" => leaf(m.diagram_link.as_deref()),
        "attributes" => Ok(Resolved::optional(
            m.attributes.as_ref().map(Node::Attributes),
        )),
        "informationAssets" => Ok(Resolved::list(&m.information_assets, Node::Asset)),
        "useCases" => Ok(Resolved::list(&m.use_cases, Node::UseCase)),
        "exclusions" => Ok(Resolved::list(&m.exclusions, Node::Exclusion)),
        "thirdPartyDependencies" => Ok(Resolved::list(
            &m.third_party_dependencies,
            Node::Dependency,
        )),
        "threats" => Ok(Resolved::list(&m.threats, Node::Threat)),
        "threatCount" => leaf(m.threat_count()),
        "controlCount" => leaf(m.control_count()),
        _ => Ok(Resolved::Null),
    }
}

fn resolve_threat<'a>(t: &'a Threat, field: &str) -> Result<Resolved<'a>, String> {
    match field {
        "name" => leaf(t.name.as_deref()),
        "description" => leaf(t.description.as_str()),
        "impacts" => leaf(t.impacts.clone()),
        "stride" => leaf(t.stride.clone()),
        "informationAssetRefs" => leaf(t.information_asset_refs.clone()),
        "controls" => Ok(Resolved::list(&t.controls, Node::Control)),
        _ => Ok(Resolved::Null),
    }
}

fn resolve_stats(stats: &Stats, field: &str) -> Resolved<'static> {
    let n = match field {
        "totalThreatModels" => stats.total_threat_models,
        "totalFiles" => stats.total_files,
        "totalThreats" => stats.total_threats,
        "totalControls" => stats.total_controls,
        "implementedControls" => stats.implemented_controls,
        "totalInformationAssets" => stats.total_information_assets,
        "totalUseCases" => stats.total_use_cases,
        "totalThirdPartyDependencies" => stats.total_third_party_dependencies,
        "internetFacingModels" => stats.internet_facing_models,
        "byAuthor" => return Resolved::List(counts("AuthorCount", &stats.by_author)),
        "byImpact" => return Resolved::List(counts("ImpactCount", &stats.by_impact)),
        "byStride" => return Resolved::List(counts("StrideCount", &stats.by_stride)),
        _ => return Resolved::Null,
    };
    Resolved::Leaf(json!(n))
}
