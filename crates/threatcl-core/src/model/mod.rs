//! Threat model document types
//!
//! These are the validated, parsed form of a `threatmodel` block. They are
//! produced by the parser adapter and owned by the document store; readers
//! receive them behind an `Arc` and never mutate them.

mod enums;

pub use enums::{InitiativeSize, UptimeDependency, IMPACT_CATEGORIES, STRIDE_CATEGORIES};

use serde::Serialize;
use std::path::PathBuf;

/// One parsed threat model, uniquely named across the corpus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatModel {
    pub name: String,
    pub source_file: PathBuf,
    pub author: String,
    pub status: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub diagram_link: Option<String>,
    pub attributes: Option<ModelAttributes>,
    pub information_assets: Vec<InformationAsset>,
    pub use_cases: Vec<UseCase>,
    pub exclusions: Vec<Exclusion>,
    pub third_party_dependencies: Vec<ThirdPartyDependency>,
    pub threats: Vec<Threat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelAttributes {
    pub new_initiative: bool,
    pub internet_facing: bool,
    pub initiative_size: InitiativeSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InformationAsset {
    pub name: String,
    pub description: Option<String>,
    pub information_classification: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UseCase {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThirdPartyDependency {
    pub name: String,
    pub description: Option<String>,
    pub saas: bool,
    pub paying_customer: bool,
    pub open_source: bool,
    pub infrastructure: bool,
    pub uptime_dependency: UptimeDependency,
    pub uptime_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threat {
    pub name: Option<String>,
    pub description: String,
    pub impacts: Vec<String>,
    pub stride: Vec<String>,
    pub information_asset_refs: Vec<String>,
    pub controls: Vec<Control>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub name: String,
    pub implemented: bool,
    pub description: Option<String>,
    pub implementation_notes: Option<String>,
    pub risk_reduction: Option<u32>,
}

impl ThreatModel {
    /// Minimal model with only the required fields set
    pub fn new(name: impl Into<String>, author: impl Into<String>, source_file: PathBuf) -> Self {
        Self {
            name: name.into(),
            source_file,
            author: author.into(),
            status: None,
            description: None,
            link: None,
            diagram_link: None,
            attributes: None,
            information_assets: Vec::new(),
            use_cases: Vec::new(),
            exclusions: Vec::new(),
            third_party_dependencies: Vec::new(),
            threats: Vec::new(),
        }
    }

    pub fn threat_count(&self) -> usize {
        self.threats.len()
    }

    pub fn control_count(&self) -> usize {
        self.threats.iter().map(|t| t.controls.len()).sum()
    }

    pub fn implemented_control_count(&self) -> usize {
        self.controls().filter(|c| c.implemented).count()
    }

    /// All controls across every threat
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.threats.iter().flat_map(|t| t.controls.iter())
    }

    pub fn is_internet_facing(&self) -> bool {
        self.attributes.as_ref().is_some_and(|a| a.internet_facing)
    }
}
