//! List command

use super::Context;
use crate::app::OutputFormat;
use crate::output::{display_path, terminal};
use anyhow::Result;

pub async fn run(ctx: &Context) -> Result<()> {
    let store = ctx.load_store()?;
    let snapshot = store.snapshot();

    match ctx.format {
        OutputFormat::Json => {
            let output: Vec<_> = snapshot
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "name": m.name,
                        "author": m.author,
                        "threats": m.threat_count(),
                        "controls": m.control_count(),
                        "file": display_path(&m.source_file, &ctx.root),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let models = snapshot.iter().map(|m| m.as_ref());
            print!("{}", terminal::format_model_table(models, &ctx.root));
        }
    }
    Ok(())
}
