//! threatcl CLI
//!
//! Query, serve and inspect a directory of threat model documents.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use threatcl_core::{exit_codes, ThreatclError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};
use commands::{Context, SilentExit};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so query output on stdout stays clean
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(SilentExit(code)) = err.downcast_ref::<SilentExit>() {
                return exit(*code);
            }
            eprintln!("Error: {}", one_line(&err));
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<ThreatclError>())
                .map(ThreatclError::exit_code)
                .unwrap_or(exit_codes::GENERAL_ERROR);
            exit(code)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.dir, cli.format)?;

    match cli.command {
        Commands::Query(args) => commands::query::run(args, &ctx).await,
        Commands::Serve(args) => commands::serve::run(args, &ctx).await,
        Commands::List => commands::list::run(&ctx).await,
        Commands::View(args) => commands::view::run(args, &ctx).await,
        Commands::Validate(args) => commands::validate::run(args, &ctx).await,
        Commands::Stats => commands::stats::run(&ctx).await,
    }
}

/// Collapse the error chain (and any multi-line parser diagnostics) into
/// a single line
fn one_line(err: &anyhow::Error) -> String {
    format!("{err:#}")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
