//! CLI command handlers

pub mod list;
pub mod query;
pub mod serve;
pub mod stats;
pub mod validate;
pub mod view;

use crate::app::OutputFormat;
use anyhow::{Context as _, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use threatcl_core::{Config, DocumentStore, ThreatModelParser};

/// Exit with a code without printing an error line; the command already
/// reported what went wrong on stdout.
#[derive(Debug)]
pub struct SilentExit(pub i32);

impl fmt::Display for SilentExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit status {}", self.0)
    }
}

impl std::error::Error for SilentExit {}

/// Settings shared by every command: config file values with CLI overrides
pub struct Context {
    pub config: Config,
    pub root: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    pub fn load(dir: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let config = Config::load().context("failed to load configuration")?;
        let root = dir.unwrap_or_else(|| config.root_or_cwd());
        Ok(Self {
            config,
            root,
            format,
        })
    }

    pub fn parser(&self) -> ThreatModelParser {
        ThreatModelParser::with_extensions(self.config.extensions.clone())
    }

    /// Store for the root, not yet loaded
    pub fn store(&self) -> Arc<DocumentStore> {
        Arc::new(DocumentStore::new(&self.root, Arc::new(self.parser())))
    }

    /// The mandatory first load; any failure is fatal
    pub fn first_load(&self, store: &DocumentStore) -> Result<()> {
        let summary = store
            .load_all()
            .with_context(|| format!("failed to load threat models from {}", self.root.display()))?;
        tracing::debug!(
            files = summary.files,
            documents = summary.documents,
            "index ready"
        );
        Ok(())
    }

    /// Build a store for the root and run the first load
    pub fn load_store(&self) -> Result<Arc<DocumentStore>> {
        let store = self.store();
        self.first_load(&store)?;
        Ok(store)
    }
}
