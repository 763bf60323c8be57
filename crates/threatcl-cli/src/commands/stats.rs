//! Stats command

use super::Context;
use crate::app::OutputFormat;
use crate::output::terminal;
use anyhow::Result;
use threatcl_core::Stats;

pub async fn run(ctx: &Context) -> Result<()> {
    let store = ctx.load_store()?;
    let stats = Stats::collect(&store.snapshot());

    match ctx.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "totalThreatModels": stats.total_threat_models,
                "totalFiles": stats.total_files,
                "totalThreats": stats.total_threats,
                "totalControls": stats.total_controls,
                "implementedControls": stats.implemented_controls,
                "internetFacingModels": stats.internet_facing_models,
                "byAuthor": counts(&stats.by_author),
                "byImpact": counts(&stats.by_impact),
                "byStride": counts(&stats.by_stride),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => print!("{}", terminal::format_stats(&stats)),
    }
    Ok(())
}

fn counts(pairs: &[(String, usize)]) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(key, count)| (key.clone(), (*count).into()))
        .collect()
}
