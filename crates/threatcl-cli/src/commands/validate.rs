//! Validate command

use super::{Context, SilentExit};
use crate::app::{OutputFormat, ValidateArgs};
use crate::output::display_path;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use threatcl_core::index::{scan_files, ScanOptions};
use threatcl_core::{DocumentParser, ThreatclError};

#[derive(Serialize)]
struct FileReport {
    file: String,
    models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct Conflict {
    name: String,
    existing: String,
    incoming: String,
}

#[derive(Serialize)]
struct Report {
    valid: bool,
    files: Vec<FileReport>,
    conflicts: Vec<Conflict>,
}

pub async fn run(args: ValidateArgs, ctx: &Context) -> Result<()> {
    // (path to parse, path to show)
    let files: Vec<(PathBuf, String)> = if args.files.is_empty() {
        if !ctx.root.is_dir() {
            return Err(ThreatclError::InvalidRoot(ctx.root.clone()).into());
        }
        let options = ScanOptions::with_extensions(&ctx.config.extensions);
        scan_files(&ctx.root, &options)?
            .into_iter()
            .map(|f| (f.path, f.relative_path))
            .collect()
    } else {
        args.files
            .into_iter()
            .map(|path| {
                let shown = display_path(&path, &ctx.root);
                (path, shown)
            })
            .collect()
    };

    let report = check(files, ctx);

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            for file in &report.files {
                match &file.error {
                    None => println!("OK     {} ({} models)", file.file, file.models.len()),
                    Some(error) => println!("ERROR  {}: {}", file.file, one_line(error)),
                }
            }
            for conflict in &report.conflicts {
                println!(
                    "CONFLICT  {:?} defined in {} and {}",
                    conflict.name, conflict.existing, conflict.incoming
                );
            }
        }
    }

    if !report.valid {
        return Err(SilentExit(1).into());
    }
    Ok(())
}

fn check(files: Vec<(PathBuf, String)>, ctx: &Context) -> Report {
    let parser = ctx.parser();
    let mut owners: BTreeMap<String, String> = BTreeMap::new();
    let mut reports = Vec::with_capacity(files.len());
    let mut conflicts = Vec::new();

    for (path, file) in files {
        match parser.parse_file(&path) {
            Ok(models) => {
                let mut names = Vec::with_capacity(models.len());
                for model in models {
                    match owners.get(&model.name) {
                        Some(existing) => conflicts.push(Conflict {
                            name: model.name.clone(),
                            existing: existing.clone(),
                            incoming: file.clone(),
                        }),
                        None => {
                            owners.insert(model.name.clone(), file.clone());
                        }
                    }
                    names.push(model.name);
                }
                reports.push(FileReport {
                    file,
                    models: names,
                    error: None,
                });
            }
            Err(error) => reports.push(FileReport {
                file,
                models: Vec::new(),
                error: Some(error.to_string()),
            }),
        }
    }

    Report {
        valid: conflicts.is_empty() && reports.iter().all(|r| r.error.is_none()),
        files: reports,
        conflicts,
    }
}

fn one_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
