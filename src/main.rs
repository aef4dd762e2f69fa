//! Podar CLI
//!
//! # Usage
//!
//! ```bash
//! # Run a pipeline on a checkpointed graph
//! podar run plan.yaml --checkpoint ./model --output ./compressed
//!
//! # Check a pipeline configuration
//! podar validate plan.yaml --detailed
//!
//! # Show accounting of a checkpoint
//! podar inspect ./compressed
//! ```

use clap::Parser;
use podar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
