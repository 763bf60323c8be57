//! threatcl Core Library
//!
//! Live index of threat-model documents.
//!
//! # Features
//! - HCL and JSON threat-model parsing with schema validation
//! - In-memory document store with atomic per-file reloads
//! - Filesystem watcher feeding a serialized ingestion loop
//! - Read-only GraphQL query engine over consistent snapshots

pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod parser;
pub mod query;
pub mod store;
pub mod watch;

pub use config::Config;
pub use error::{exit_codes, Error, Result, ThreatclError};
pub use model::{
    Control, Exclusion, InformationAsset, InitiativeSize, ModelAttributes, ThirdPartyDependency,
    Threat, ThreatModel, UptimeDependency, UseCase,
};
pub use parser::{DocumentParser, SourceFormat, ThreatModelParser};
pub use query::{
    PathSegment, QueryEngine, QueryError, QueryRequest, QueryResponse, Stats, ThreatModelFilter,
};
pub use store::{DocumentStore, LoadSummary, ReloadOutcome, Snapshot};
pub use watch::{
    ChangeEvent, DocumentWatcher, IngestStats, IngestionLoop, PendingWatch, WatchHandle,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "threatcl";
