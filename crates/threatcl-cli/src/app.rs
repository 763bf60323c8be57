//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "threatcl")]
#[command(
    author,
    version,
    about = "Live index and query engine for threat model documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding threat model files (default: config root, else .)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Output format for list, view, validate and stats
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute one GraphQL query against a freshly loaded index
    Query(QueryArgs),

    /// Serve the index over HTTP, keeping it live as files change
    Serve(ServeArgs),

    /// List threat models
    #[command(alias = "ls")]
    List,

    /// Show one threat model in detail
    View(ViewArgs),

    /// Parse files and report errors and name conflicts
    Validate(ValidateArgs),

    /// Show aggregate statistics
    Stats,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Query text; read from stdin when neither this nor --file is given
    pub query: Option<String>,

    /// Read the query from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Variables as a JSON object
    #[arg(long)]
    pub vars: Option<String>,

    /// Operation to run when the document defines several
    #[arg(long)]
    pub operation: Option<String>,

    /// Envelope encoding
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub output: QueryOutput,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (default: config server.addr)
    #[arg(long)]
    pub addr: Option<String>,

    /// Serve a static snapshot without watching for changes
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(Args)]
pub struct ViewArgs {
    /// Threat model name
    pub name: String,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Files to check (default: every recognized file under --dir)
    pub files: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum QueryOutput {
    /// Indented JSON
    Pretty,
    /// Minified JSON
    Compact,
    Yaml,
}
