//! Document parser adapter
//!
//! Turns the bytes of one file into zero or more validated threat models.
//! Two source formats are recognized:
//! - `.hcl`: native HCL `threatmodel "<name>" { ... }` blocks
//! - `.json`: the same tree in canonical JSON form
//!
//! Both are normalized into one JSON tree (block labels become a `name` key,
//! repeated blocks become arrays) and decoded through a single serde schema,
//! so validation rules are shared.

mod decode;
mod hcl_tree;

use crate::error::{Result, ThreatclError};
use crate::model::ThreatModel;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Extensions recognized by default
pub const DEFAULT_EXTENSIONS: &[&str] = &["hcl", "json"];

/// Parser adapter trait - the store only talks to documents through this
pub trait DocumentParser: Send + Sync {
    /// File extensions (without the dot) this parser accepts
    fn extensions(&self) -> &[String];

    /// Parse one file into its threat models
    fn parse_file(&self, path: &Path) -> Result<Vec<ThreatModel>>;

    /// Whether `path` carries a recognized extension
    fn recognizes(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().iter().any(|known| known == ext))
    }
}

/// Source format of a document file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Hcl,
    Json,
}

impl SourceFormat {
    /// Format for a path; anything that is not `.json` is read as HCL
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Hcl,
        }
    }
}

/// Default parser for HCL and JSON threat model files
#[derive(Debug, Clone)]
pub struct ThreatModelParser {
    extensions: Vec<String>,
}

impl Default for ThreatModelParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatModelParser {
    pub fn new() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect())
    }

    /// Parser accepting a custom extension set (e.g. from config)
    pub fn with_extensions(extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    /// Parse in-memory content as if it had been read from `path`
    pub fn parse_str(
        &self,
        content: &str,
        path: &Path,
        format: SourceFormat,
    ) -> Result<Vec<ThreatModel>> {
        let tree = match format {
            SourceFormat::Hcl => hcl_tree::to_tree(content, path)?,
            SourceFormat::Json => serde_json::from_str::<Value>(content)
                .map_err(|e| ThreatclError::parse(path, format!("invalid JSON: {}", e)))?,
        };
        decode::decode_tree(tree, path)
    }
}

impl DocumentParser for ThreatModelParser {
    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn parse_file(&self, path: &Path) -> Result<Vec<ThreatModel>> {
        let content = fs::read_to_string(path).map_err(|e| {
            ThreatclError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read {}: {}", path.display(), e),
            ))
        })?;
        self.parse_str(&content, path, SourceFormat::for_path(path))
    }
}
