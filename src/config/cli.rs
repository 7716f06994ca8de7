use crate::domain::keys::RunTimestamp;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "commerce-etl")]
#[command(about = "Ingest, clean and stage e-commerce tables for one pipeline run")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage after each stage")]
    pub monitor: bool,

    /// Use a local directory instead of S3 for the raw and clean zones
    #[arg(long, global = true, value_name = "DIR")]
    pub local_store: Option<PathBuf>,

    /// Table contract file replacing the built-in registry
    #[arg(long, global = true, value_name = "FILE")]
    pub schema: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a fresh run timestamp for the scheduler to pass to every stage
    RunTs,
    /// Copy local source files into the raw zone
    Ingest(IngestArgs),
    /// Clean every raw table of a run into the clean zone
    Clean(RunArgs),
    /// Load every clean table of a run into the staging schema
    Load(RunArgs),
    /// Ingest, clean and load in sequence
    Run(IngestArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// ISO-8601 run timestamp shared by every stage of the run
    #[arg(value_parser = parse_run_timestamp)]
    pub run_ts: RunTimestamp,
}

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Directory holding `<table>.csv` source files
    #[arg(long, env = "SOURCE_DIR", default_value = "data/raw")]
    pub source_dir: PathBuf,

    /// TOML manifest overriding source locations
    #[arg(long, value_name = "FILE")]
    pub sources: Option<PathBuf>,
}

/// Which stages a command runs, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub ingest: bool,
    pub clean: bool,
    pub load: bool,
}

impl Command {
    pub fn plan(&self) -> Option<StagePlan> {
        let plan = |ingest, clean, load| Some(StagePlan { ingest, clean, load });
        match self {
            Command::RunTs => None,
            Command::Ingest(_) => plan(true, false, false),
            Command::Clean(_) => plan(false, true, false),
            Command::Load(_) => plan(false, false, true),
            Command::Run(_) => plan(true, true, true),
        }
    }

    pub fn run_ts(&self) -> Option<&RunTimestamp> {
        match self {
            Command::RunTs => None,
            Command::Ingest(args) | Command::Run(args) => Some(&args.run.run_ts),
            Command::Clean(args) | Command::Load(args) => Some(&args.run_ts),
        }
    }

    pub fn ingest_args(&self) -> Option<&IngestArgs> {
        match self {
            Command::Ingest(args) | Command::Run(args) => Some(args),
            _ => None,
        }
    }
}

fn parse_run_timestamp(value: &str) -> Result<RunTimestamp, String> {
    RunTimestamp::parse(value).map_err(|e| e.to_string())
}
