//! Typed filter for the `threatModels` list field

use crate::model::{InitiativeSize, ThreatModel, IMPACT_CATEGORIES, STRIDE_CATEGORIES};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Argument names accepted by `threatModels`
pub const FILTER_ARGS: &[&str] = &[
    "author",
    "status",
    "nameContains",
    "search",
    "internetFacing",
    "newInitiative",
    "initiativeSize",
    "impact",
    "stride",
    "hasUnimplementedControls",
    "limit",
    "offset",
];

/// Conjunction of optional constraints; `None` means unconstrained
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatModelFilter {
    pub author: Option<String>,
    pub status: Option<String>,
    pub name_contains: Option<String>,
    pub search: Option<String>,
    pub internet_facing: Option<bool>,
    pub new_initiative: Option<bool>,
    pub initiative_size: Option<InitiativeSize>,
    pub impact: Option<String>,
    pub stride: Option<String>,
    pub has_unimplemented_controls: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ThreatModelFilter {
    /// Build a filter from already-coerced argument values.
    ///
    /// Explicit `null` counts as absent. Any wrong type, unknown enum value
    /// or negative paging value is an error.
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, String> {
        let mut filter = Self::default();

        for (key, value) in args {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "author" => filter.author = Some(string_arg(key, value)?),
                "status" => filter.status = Some(string_arg(key, value)?),
                "nameContains" => filter.name_contains = Some(string_arg(key, value)?),
                "search" => filter.search = Some(string_arg(key, value)?),
                "internetFacing" => filter.internet_facing = Some(bool_arg(key, value)?),
                "newInitiative" => filter.new_initiative = Some(bool_arg(key, value)?),
                "hasUnimplementedControls" => {
                    filter.has_unimplemented_controls = Some(bool_arg(key, value)?)
                }
                "initiativeSize" => {
                    let raw = string_arg(key, value)?;
                    let size = raw.parse::<InitiativeSize>().map_err(|_| {
                        format!(
                            "Argument \"initiativeSize\" has invalid value \"{raw}\"; expected one of {}",
                            InitiativeSize::ALL
                                .iter()
                                .map(|s| s.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        )
                    })?;
                    filter.initiative_size = Some(size);
                }
                "impact" => filter.impact = Some(category_arg(key, value, IMPACT_CATEGORIES)?),
                "stride" => filter.stride = Some(category_arg(key, value, STRIDE_CATEGORIES)?),
                "limit" => filter.limit = Some(count_arg(key, value)?),
                "offset" => filter.offset = Some(count_arg(key, value)?),
                other => {
                    return Err(format!(
                        "Unknown argument \"{other}\" on field \"Query.threatModels\""
                    ))
                }
            }
        }

        Ok(filter)
    }

    pub fn matches(&self, model: &ThreatModel) -> bool {
        if let Some(author) = &self.author {
            if model.author != *author {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if model.status.as_deref() != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !model.name.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            if !search_matches(model, needle) {
                return false;
            }
        }
        if let Some(expected) = self.internet_facing {
            if model.is_internet_facing() != expected {
                return false;
            }
        }
        if let Some(expected) = self.new_initiative {
            let actual = model.attributes.as_ref().is_some_and(|a| a.new_initiative);
            if actual != expected {
                return false;
            }
        }
        if let Some(expected) = self.initiative_size {
            let actual = model
                .attributes
                .as_ref()
                .map(|a| a.initiative_size)
                .unwrap_or_default();
            if actual != expected {
                return false;
            }
        }
        if let Some(impact) = &self.impact {
            if !model.threats.iter().any(|t| t.impacts.contains(impact)) {
                return false;
            }
        }
        if let Some(category) = &self.stride {
            if !model.threats.iter().any(|t| t.stride.contains(category)) {
                return false;
            }
        }
        if let Some(expected) = self.has_unimplemented_controls {
            if model.controls().any(|c| !c.implemented) != expected {
                return false;
            }
        }
        true
    }

    /// Filter models already in name order, then page
    pub fn apply<'a, I>(&self, models: I) -> Vec<&'a Arc<ThreatModel>>
    where
        I: Iterator<Item = &'a Arc<ThreatModel>>,
    {
        models
            .filter(|m| self.matches(m))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

fn search_matches(model: &ThreatModel, needle: &str) -> bool {
    model.name.contains(needle)
        || model.description.as_deref().is_some_and(|d| d.contains(needle))
        || model.threats.iter().any(|t| t.description.contains(needle))
        || model
            .controls()
            .any(|c| c.description.as_deref().is_some_and(|d| d.contains(needle)))
}

fn string_arg(key: &str, value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("Argument \"{key}\" expected a String, found {value}"))
}

fn bool_arg(key: &str, value: &Value) -> Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("Argument \"{key}\" expected a Boolean, found {value}"))
}

fn count_arg(key: &str, value: &Value) -> Result<usize, String> {
    let n = value
        .as_i64()
        .ok_or_else(|| format!("Argument \"{key}\" expected an Int, found {value}"))?;
    usize::try_from(n).map_err(|_| format!("Argument \"{key}\" must not be negative, found {n}"))
}

fn category_arg(key: &str, value: &Value, allowed: &[&str]) -> Result<String, String> {
    let raw = string_arg(key, value)?;
    if allowed.contains(&raw.as_str()) {
        Ok(raw)
    } else {
        Err(format!(
            "Argument \"{key}\" has invalid value \"{raw}\"; expected one of {}",
            allowed.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Control, ModelAttributes, Threat};
    use serde_json::json;
    use std::path::PathBuf;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn model(name: &str, author: &str) -> ThreatModel {
        ThreatModel::new(name, author, PathBuf::from(format!("/m/{name}.hcl")))
    }

    fn threatened(name: &str) -> ThreatModel {
        let mut m = model(name, "x");
        m.attributes = Some(ModelAttributes {
            new_initiative: true,
            internet_facing: true,
            initiative_size: InitiativeSize::Large,
        });
        m.threats.push(Threat {
            name: None,
            description: "Token replay against the login API".into(),
            impacts: vec!["Confidentiality".into()],
            stride: vec!["Spoofing".into()],
            information_asset_refs: Vec::new(),
            controls: vec![Control {
                name: "Nonce".into(),
                implemented: false,
                description: Some("Single-use nonce per request".into()),
                implementation_notes: None,
                risk_reduction: Some(60),
            }],
        });
        m
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ThreatModelFilter::from_args(&Map::new()).unwrap();
        assert_eq!(filter, ThreatModelFilter::default());
        assert!(filter.matches(&model("A", "x")));
    }

    #[test]
    fn test_null_arguments_are_absent() {
        let filter = ThreatModelFilter::from_args(&args(json!({"author": null}))).unwrap();
        assert!(filter.author.is_none());
    }

    #[test]
    fn test_exact_and_substring_matching() {
        let a = threatened("Payments API");
        let b = model("Billing", "y");

        let filter = ThreatModelFilter::from_args(&args(json!({"author": "x"}))).unwrap();
        assert!(filter.matches(&a) && !filter.matches(&b));

        let filter =
            ThreatModelFilter::from_args(&args(json!({"nameContains": "API"}))).unwrap();
        assert!(filter.matches(&a) && !filter.matches(&b));

        let filter = ThreatModelFilter::from_args(&args(json!({"nameContains": "api"}))).unwrap();
        assert!(!filter.matches(&a));

        let filter = ThreatModelFilter::from_args(&args(json!({"search": "nonce"}))).unwrap();
        assert!(filter.matches(&a));
        let filter = ThreatModelFilter::from_args(&args(json!({"search": "replay"}))).unwrap();
        assert!(filter.matches(&a) && !filter.matches(&b));
    }

    #[test]
    fn test_attribute_and_threat_filters() {
        let a = threatened("A");
        let b = model("B", "x");

        let cases = [
            json!({"internetFacing": true}),
            json!({"newInitiative": true}),
            json!({"initiativeSize": "Large"}),
            json!({"impact": "Confidentiality"}),
            json!({"stride": "Spoofing"}),
            json!({"hasUnimplementedControls": true}),
        ];
        for case in cases {
            let filter = ThreatModelFilter::from_args(&args(case.clone())).unwrap();
            assert!(filter.matches(&a), "{case} should match A");
            assert!(!filter.matches(&b), "{case} should not match B");
        }

        let filter =
            ThreatModelFilter::from_args(&args(json!({"initiativeSize": "Undefined"}))).unwrap();
        assert!(filter.matches(&b));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let a = threatened("A");
        let filter = ThreatModelFilter::from_args(&args(
            json!({"author": "x", "impact": "Availability"}),
        ))
        .unwrap();
        assert!(!filter.matches(&a));
    }

    #[test]
    fn test_malformed_values_rejected() {
        for case in [
            json!({"author": 3}),
            json!({"internetFacing": "yes"}),
            json!({"impact": "Chaos"}),
            json!({"stride": "spoofing"}),
            json!({"initiativeSize": "Huge"}),
            json!({"limit": -1}),
            json!({"offset": 1.5}),
            json!({"colour": "red"}),
        ] {
            assert!(
                ThreatModelFilter::from_args(&args(case.clone())).is_err(),
                "{case} should be rejected"
            );
        }
    }

    #[test]
    fn test_apply_pages_after_filtering() {
        let models: Vec<Arc<ThreatModel>> = ["A", "B", "C", "D"]
            .iter()
            .map(|n| Arc::new(model(n, "x")))
            .collect();
        let filter =
            ThreatModelFilter::from_args(&args(json!({"offset": 1, "limit": 2}))).unwrap();
        let names: Vec<&str> = filter
            .apply(models.iter())
            .into_iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "C"]);

        let filter = ThreatModelFilter::from_args(&args(json!({"limit": 0}))).unwrap();
        assert!(filter.apply(models.iter()).is_empty());
    }
}
