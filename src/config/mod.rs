//! Command-line configuration

mod cli;

pub use cli::{parse_args, Cli, Command, InspectArgs, OutputFormat, RunArgs, ValidateArgs};
