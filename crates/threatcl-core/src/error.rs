//! Error types for threatcl

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ThreatclError
pub type Result<T> = std::result::Result<T, ThreatclError>;

/// Error type alias for convenience
pub type Error = ThreatclError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
}

/// Main error type for threatcl
#[derive(Debug, Error)]
pub enum ThreatclError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Parse error in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Threat model not found: {0}")]
    DocumentNotFound(String),

    #[error(
        "Threat model name conflict: {name:?} is defined in {} and {}",
        .existing.display(),
        .incoming.display()
    )]
    NameConflict {
        name: String,
        existing: PathBuf,
        incoming: PathBuf,
    },

    #[error("Invalid root directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ThreatclError {
    /// Build a parse error for `path`
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the underlying cause is a missing file
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Get the exit code for this error. Fatal conditions such as a bad
    /// root or an unparsable file all exit with the general code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DocumentNotFound(_) => exit_codes::NOT_FOUND,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
