//! Static schema description and document validation

use super::filter::FILTER_ARGS;
use super::syntax::{Field, Operation, Value};
use super::QueryError;
use std::collections::HashSet;

/// Field of an object type
#[derive(Debug)]
pub(super) struct FieldDef {
    pub name: &'static str,
    /// Type as written in SDL, used in error messages
    pub ty: &'static str,
    /// Object type of the field's values; `None` for scalars
    pub object: Option<&'static str>,
    pub args: &'static [&'static str],
}

const fn scalar(name: &'static str, ty: &'static str) -> FieldDef {
    FieldDef {
        name,
        ty,
        object: None,
        args: &[],
    }
}

const fn object(name: &'static str, ty: &'static str, object: &'static str) -> FieldDef {
    FieldDef {
        name,
        ty,
        object: Some(object),
        args: &[],
    }
}

pub(super) const QUERY: &str = "Query";

const QUERY_FIELDS: &[FieldDef] = &[
    object("stats", "Stats!", "Stats"),
    FieldDef {
        name: "threatModels",
        // Nullable so a bad filter nulls only this field
        ty: "[ThreatModel!]",
        object: Some("ThreatModel"),
        args: FILTER_ARGS,
    },
    FieldDef {
        name: "threatModel",
        ty: "ThreatModel",
        object: Some("ThreatModel"),
        args: &["name"],
    },
];

const THREAT_MODEL_FIELDS: &[FieldDef] = &[
    scalar("name", "String!"),
    scalar("sourceFile", "String!"),
    scalar("author", "String!"),
    scalar("status", "String"),
    scalar("description", "String"),
    scalar("link", "String"),
    scalar("diagramLink", "String"),
    object("attributes", "Attributes", "Attributes"),
    object(
        "informationAssets",
        "[InformationAsset!]!",
        "InformationAsset",
    ),
    object("useCases", "[UseCase!]!", "UseCase"),
    object("exclusions", "[Exclusion!]!", "Exclusion"),
    object(
        "thirdPartyDependencies",
        "[ThirdPartyDependency!]!",
        "ThirdPartyDependency",
    ),
    object("threats", "[Threat!]!", "Threat"),
    scalar("threatCount", "Int!"),
    scalar("controlCount", "Int!"),
];

const ATTRIBUTES_FIELDS: &[FieldDef] = &[
    scalar("newInitiative", "Boolean!"),
    scalar("internetFacing", "Boolean!"),
    scalar("initiativeSize", "String!"),
];

const INFORMATION_ASSET_FIELDS: &[FieldDef] = &[
    scalar("name", "String!"),
    scalar("description", "String"),
    scalar("informationClassification", "String"),
    scalar("source", "String"),
];

const DESCRIBED_FIELDS: &[FieldDef] = &[scalar("description", "String!")];

const DEPENDENCY_FIELDS: &[FieldDef] = &[
    scalar("name", "String!"),
    scalar("description", "String"),
    scalar("saas", "Boolean!"),
    scalar("payingCustomer", "Boolean!"),
    scalar("openSource", "Boolean!"),
    scalar("infrastructure", "Boolean!"),
    scalar("uptimeDependency", "String!"),
    scalar("uptimeNotes", "String"),
];

const THREAT_FIELDS: &[FieldDef] = &[
    scalar("name", "String"),
    scalar("description", "String!"),
    scalar("impacts", "[String!]!"),
    scalar("stride", "[String!]!"),
    scalar("informationAssetRefs", "[String!]!"),
    object("controls", "[Control!]!", "Control"),
];

const CONTROL_FIELDS: &[FieldDef] = &[
    scalar("name", "String!"),
    scalar("implemented", "Boolean!"),
    scalar("description", "String"),
    scalar("implementationNotes", "String"),
    scalar("riskReduction", "Int"),
];

const STATS_FIELDS: &[FieldDef] = &[
    scalar("totalThreatModels", "Int!"),
    scalar("totalFiles", "Int!"),
    scalar("totalThreats", "Int!"),
    scalar("totalControls", "Int!"),
    scalar("implementedControls", "Int!"),
    scalar("totalInformationAssets", "Int!"),
    scalar("totalUseCases", "Int!"),
    scalar("totalThirdPartyDependencies", "Int!"),
    scalar("internetFacingModels", "Int!"),
    object("byAuthor", "[AuthorCount!]!", "AuthorCount"),
    object("byImpact", "[ImpactCount!]!", "ImpactCount"),
    object("byStride", "[StrideCount!]!", "StrideCount"),
];

const AUTHOR_COUNT_FIELDS: &[FieldDef] = &[scalar("author", "String!"), scalar("count", "Int!")];
const IMPACT_COUNT_FIELDS: &[FieldDef] = &[scalar("impact", "String!"), scalar("count", "Int!")];
const STRIDE_COUNT_FIELDS: &[FieldDef] =
    &[scalar("category", "String!"), scalar("count", "Int!")];

fn fields_of(type_name: &str) -> &'static [FieldDef] {
    match type_name {
        QUERY => QUERY_FIELDS,
        "ThreatModel" => THREAT_MODEL_FIELDS,
        "Attributes" => ATTRIBUTES_FIELDS,
        "InformationAsset" => INFORMATION_ASSET_FIELDS,
        "UseCase" | "Exclusion" => DESCRIBED_FIELDS,
        "ThirdPartyDependency" => DEPENDENCY_FIELDS,
        "Threat" => THREAT_FIELDS,
        "Control" => CONTROL_FIELDS,
        "Stats" => STATS_FIELDS,
        "AuthorCount" => AUTHOR_COUNT_FIELDS,
        "ImpactCount" => IMPACT_COUNT_FIELDS,
        "StrideCount" => STRIDE_COUNT_FIELDS,
        _ => &[],
    }
}

pub(super) fn field_def(type_name: &str, field: &str) -> Option<&'static FieldDef> {
    fields_of(type_name).iter().find(|def| def.name == field)
}

/// Check an operation against the schema before anything is executed
pub(super) fn validate(operation: &Operation) -> Vec<QueryError> {
    let mut errors = Vec::new();

    let mut declared = HashSet::new();
    for var in &operation.variables {
        if !declared.insert(var.name.as_str()) {
            errors.push(QueryError::at(
                format!("There can be only one variable named \"${}\".", var.name),
                var.pos,
            ));
        }
    }

    validate_selection(QUERY, &operation.selection, &declared, &mut errors);
    errors
}

fn validate_selection(
    parent: &str,
    fields: &[Field],
    declared: &HashSet<&str>,
    errors: &mut Vec<QueryError>,
) {
    for field in fields {
        for (_, value) in &field.arguments {
            check_variables(value, field, declared, errors);
        }

        if field.name == "__typename" {
            if field.selection.is_some() {
                errors.push(QueryError::at(
                    "Field \"__typename\" must not have a selection since type \"String!\" has no subfields.",
                    field.pos,
                ));
            }
            continue;
        }

        let Some(def) = field_def(parent, &field.name) else {
            errors.push(QueryError::at(
                format!(
                    "Cannot query field \"{}\" on type \"{parent}\".",
                    field.name
                ),
                field.pos,
            ));
            continue;
        };

        match (def.object, &field.selection) {
            (Some(child), Some(selection)) => {
                validate_selection(child, selection, declared, errors)
            }
            (Some(_), None) => errors.push(QueryError::at(
                format!(
                    "Field \"{}\" of type \"{}\" must have a selection of subfields.",
                    def.name, def.ty
                ),
                field.pos,
            )),
            (None, Some(_)) => errors.push(QueryError::at(
                format!(
                    "Field \"{}\" must not have a selection since type \"{}\" has no subfields.",
                    def.name, def.ty
                ),
                field.pos,
            )),
            (None, None) => {}
        }
    }
}

fn check_variables(
    value: &Value,
    field: &Field,
    declared: &HashSet<&str>,
    errors: &mut Vec<QueryError>,
) {
    match value {
        Value::Variable(name) if !declared.contains(name.as_str()) => {
            errors.push(QueryError::at(
                format!("Variable \"${name}\" is not defined."),
                field.pos,
            ));
        }
        Value::List(items) => {
            for item in items {
                check_variables(item, field, declared, errors);
            }
        }
        Value::Object(entries) => {
            for (_, item) in entries {
                check_variables(item, field, declared, errors);
            }
        }
        _ => {}
    }
}
