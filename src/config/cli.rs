//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! podar run plan.yaml --checkpoint ./model --output ./compressed
//! podar validate plan.yaml --detailed
//! podar inspect ./compressed --format json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Podar: pass pipeline for neural network compression
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "podar")]
#[command(version)]
#[command(about = "Prune, quantize, retrain and Huffman-code a model graph with size and FLOP accounting")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a pass pipeline on a checkpointed graph
    Run(RunArgs),

    /// Resolve a pipeline configuration without running it
    Validate(ValidateArgs),

    /// Show accounting and sparsity of a checkpoint
    Inspect(InspectArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Path to the YAML pipeline configuration
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Checkpoint directory holding the input graph
    #[arg(short, long)]
    pub checkpoint: PathBuf,

    /// Directory the final graph is saved to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of synthetic calibration batches
    #[arg(long, default_value_t = 1)]
    pub calibration_batches: usize,

    /// Samples per calibration batch
    #[arg(short, long, default_value_t = 8)]
    pub batch_size: usize,

    /// Seed of the synthetic calibration data
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Write the full pipeline report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Summary format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to the YAML pipeline configuration
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Print each resolved pass configuration
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the inspect command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InspectArgs {
    /// Checkpoint directory
    #[arg(value_name = "CHECKPOINT")]
    pub checkpoint: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format of command summaries
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {s}. Valid formats: text, json")),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
