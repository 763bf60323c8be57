//! Schema decoding and validation of the normalized document tree

use crate::error::{Result, ThreatclError};
use crate::model::{
    Control, Exclusion, InformationAsset, InitiativeSize, ModelAttributes, ThirdPartyDependency,
    Threat, ThreatModel, UptimeDependency, UseCase, IMPACT_CATEGORIES, STRIDE_CATEGORIES,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    #[serde(default)]
    #[allow(dead_code)]
    spec_version: Option<String>,
    #[serde(default)]
    threatmodel: Vec<RawThreatModel>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThreatModel {
    name: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    diagram_link: Option<String>,
    #[serde(default)]
    attributes: Vec<RawAttributes>,
    #[serde(default)]
    information_asset: Vec<RawInformationAsset>,
    #[serde(default)]
    usecase: Vec<RawDescribed>,
    #[serde(default)]
    exclusion: Vec<RawDescribed>,
    #[serde(default)]
    third_party_dependency: Vec<RawDependency>,
    #[serde(default)]
    threat: Vec<RawThreat>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAttributes {
    #[serde(default)]
    new_initiative: bool,
    #[serde(default)]
    internet_facing: bool,
    #[serde(default)]
    initiative_size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInformationAsset {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    information_classification: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescribed {
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependency {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    saas: bool,
    #[serde(default)]
    paying_customer: bool,
    #[serde(default)]
    open_source: bool,
    #[serde(default)]
    infrastructure: bool,
    #[serde(default)]
    uptime_dependency: Option<String>,
    #[serde(default)]
    uptime_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThreat {
    #[serde(default)]
    name: Option<String>,
    description: String,
    #[serde(default)]
    impacts: Vec<String>,
    #[serde(default)]
    stride: Vec<String>,
    #[serde(default)]
    information_asset_refs: Vec<String>,
    #[serde(default)]
    control: Vec<RawControl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawControl {
    name: String,
    #[serde(default)]
    implemented: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    implementation_notes: Option<String>,
    #[serde(default)]
    risk_reduction: Option<u32>,
}

/// Decode a normalized tree into validated threat models
pub(super) fn decode_tree(tree: Value, path: &Path) -> Result<Vec<ThreatModel>> {
    if !tree.is_object() {
        return Err(ThreatclError::parse(path, "document root must be an object"));
    }

    let raw: RawFile = serde_json::from_value(tree)
        .map_err(|e| ThreatclError::parse(path, format!("schema error: {}", e)))?;

    let mut seen = HashSet::new();
    let mut models = Vec::with_capacity(raw.threatmodel.len());
    for raw_model in raw.threatmodel {
        if !seen.insert(raw_model.name.clone()) {
            return Err(ThreatclError::parse(
                path,
                format!("threatmodel {:?} is defined more than once", raw_model.name),
            ));
        }
        let model = convert_model(raw_model, path)
            .map_err(|message| ThreatclError::parse(path, message))?;
        models.push(model);
    }

    Ok(models)
}

fn convert_model(raw: RawThreatModel, path: &Path) -> std::result::Result<ThreatModel, String> {
    let name = raw.name;
    if name.trim().is_empty() {
        return Err("threatmodel name must not be empty".to_string());
    }
    let ctx = |msg: String| format!("threatmodel {:?}: {}", name, msg);

    let author = match raw.author {
        Some(a) if !a.trim().is_empty() => a,
        _ => return Err(ctx("missing required attribute `author`".to_string())),
    };

    if raw.attributes.len() > 1 {
        return Err(ctx("only one `attributes` block is allowed".to_string()));
    }
    let attributes = raw
        .attributes
        .into_iter()
        .next()
        .map(|a| -> std::result::Result<ModelAttributes, String> {
            let initiative_size = match a.initiative_size {
                Some(s) => s.parse::<InitiativeSize>().map_err(&ctx)?,
                None => InitiativeSize::default(),
            };
            Ok(ModelAttributes {
                new_initiative: a.new_initiative,
                internet_facing: a.internet_facing,
                initiative_size,
            })
        })
        .transpose()?;

    let mut asset_names = HashSet::new();
    let mut information_assets = Vec::with_capacity(raw.information_asset.len());
    for asset in raw.information_asset {
        if !asset_names.insert(asset.name.clone()) {
            return Err(ctx(format!(
                "information_asset {:?} is defined more than once",
                asset.name
            )));
        }
        information_assets.push(InformationAsset {
            name: asset.name,
            description: asset.description,
            information_classification: asset.information_classification,
            source: asset.source,
        });
    }

    let third_party_dependencies = raw
        .third_party_dependency
        .into_iter()
        .map(|d| -> std::result::Result<ThirdPartyDependency, String> {
            let uptime_dependency = match d.uptime_dependency {
                Some(s) => s.parse::<UptimeDependency>().map_err(&ctx)?,
                None => UptimeDependency::default(),
            };
            Ok(ThirdPartyDependency {
                name: d.name,
                description: d.description,
                saas: d.saas,
                paying_customer: d.paying_customer,
                open_source: d.open_source,
                infrastructure: d.infrastructure,
                uptime_dependency,
                uptime_notes: d.uptime_notes,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let threats = raw
        .threat
        .into_iter()
        .map(|t| convert_threat(t, &asset_names).map_err(&ctx))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ThreatModel {
        name: name.clone(),
        source_file: path.to_path_buf(),
        author,
        status: raw.status,
        description: raw.description,
        link: raw.link,
        diagram_link: raw.diagram_link,
        attributes,
        information_assets,
        use_cases: raw
            .usecase
            .into_iter()
            .map(|u| UseCase {
                description: u.description,
            })
            .collect(),
        exclusions: raw
            .exclusion
            .into_iter()
            .map(|e| Exclusion {
                description: e.description,
            })
            .collect(),
        third_party_dependencies,
        threats,
    })
}

fn convert_threat(
    raw: RawThreat,
    asset_names: &HashSet<String>,
) -> std::result::Result<Threat, String> {
    let label = raw
        .name
        .clone()
        .unwrap_or_else(|| raw.description.chars().take(40).collect());

    for impact in &raw.impacts {
        if !IMPACT_CATEGORIES.contains(&impact.as_str()) {
            return Err(format!(
                "threat {:?}: invalid impact {:?}, expected one of {}",
                label,
                impact,
                IMPACT_CATEGORIES.join(", ")
            ));
        }
    }
    for category in &raw.stride {
        if !STRIDE_CATEGORIES.contains(&category.as_str()) {
            return Err(format!(
                "threat {:?}: invalid stride {:?}, expected one of {}",
                label,
                category,
                STRIDE_CATEGORIES.join(", ")
            ));
        }
    }
    for asset_ref in &raw.information_asset_refs {
        if !asset_names.contains(asset_ref) {
            return Err(format!(
                "threat {:?}: information_asset_refs names unknown asset {:?}",
                label, asset_ref
            ));
        }
    }

    let mut controls = Vec::with_capacity(raw.control.len());
    for control in raw.control {
        if let Some(reduction) = control.risk_reduction {
            if reduction > 100 {
                return Err(format!(
                    "control {:?}: risk_reduction must be between 0 and 100, got {}",
                    control.name, reduction
                ));
            }
        }
        controls.push(Control {
            name: control.name,
            implemented: control.implemented,
            description: control.description,
            implementation_notes: control.implementation_notes,
            risk_reduction: control.risk_reduction,
        });
    }

    Ok(Threat {
        name: raw.name,
        description: raw.description,
        impacts: raw.impacts,
        stride: raw.stride,
        information_asset_refs: raw.information_asset_refs,
        controls,
    })
}
