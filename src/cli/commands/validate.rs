//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::ValidateArgs;
use crate::pipeline::{PassKind, PipelinePlan};

/// Format one resolved pass as a line
pub fn format_pass(index: usize, plan: &PipelinePlan) -> Option<String> {
    let entry = plan.entries().get(index)?;
    let save = entry
        .save_dir
        .as_ref()
        .map(|d| format!(" -> {}", d.display()))
        .unwrap_or_default();
    Some(format!("  {index}. {}{save}", entry.kind))
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    let plan = PipelinePlan::from_path(&args.plan).map_err(|e| format!("Config error: {e}"))?;

    log(level, LogLevel::Normal, &format!("Configuration valid: {} passes", plan.len()));
    for index in 0..plan.len() {
        if let Some(line) = format_pass(index, &plan) {
            log(level, LogLevel::Normal, &line);
        }
        if args.detailed {
            let config = &plan.entries()[index].config;
            let yaml = serde_yaml::to_string(config).map_err(|e| format!("YAML error: {e}"))?;
            for line in yaml.lines() {
                log(level, LogLevel::Normal, &format!("       {line}"));
            }
        }
    }

    if plan.entries().iter().any(|e| e.kind == PassKind::Retrain) {
        log(
            level,
            LogLevel::Normal,
            "  Note: retrain passes need a trainer registered through the library API",
        );
    }
    Ok(())
}
