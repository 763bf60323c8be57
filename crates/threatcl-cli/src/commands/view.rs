//! View command

use super::Context;
use crate::app::{OutputFormat, ViewArgs};
use crate::output::terminal;
use anyhow::Result;

pub async fn run(args: ViewArgs, ctx: &Context) -> Result<()> {
    let store = ctx.load_store()?;
    let model = store.get(&args.name)?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*model)?),
        OutputFormat::Table => print!("{}", terminal::format_model_detail(&model, &ctx.root)),
    }
    Ok(())
}
