use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "recstore",
    about = "recstore: check resource schemas and replay injection scripts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a schema file and list its resources
    Check(CheckArgs),
    /// Apply an injection script against a schema and print the result
    Apply(ApplyArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// TOML schema with `[store]` and `[[resource]]` tables
    #[arg(short, long)]
    pub schema: PathBuf,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[arg(short, long)]
    pub schema: PathBuf,
    /// JSON array of script steps
    #[arg(long)]
    pub script: PathBuf,
    /// Omit change history from the report
    #[arg(long)]
    pub no_history: bool,
}
