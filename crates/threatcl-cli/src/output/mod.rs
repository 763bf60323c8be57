//! Output formatters

pub mod terminal;

use crate::app::QueryOutput;
use anyhow::Result;
use std::path::Path;
use threatcl_core::QueryResponse;

/// Encode a query envelope for stdout
pub fn render_envelope(response: &QueryResponse, output: QueryOutput) -> Result<String> {
    Ok(match output {
        QueryOutput::Pretty => serde_json::to_string_pretty(response)?,
        QueryOutput::Compact => serde_json::to_string(response)?,
        QueryOutput::Yaml => serde_yaml::to_string(response)?
            .trim_end()
            .to_string(),
    })
}

/// Path shown to users: relative to the root when possible
pub fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
