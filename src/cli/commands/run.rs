//! Run command implementation

use super::inspect::format_accounting;
use crate::accounting::Reduction;
use crate::checkpoint;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{OutputFormat, RunArgs};
use crate::pipeline::{PassKind, PassRecord, Pipeline, PipelineContext, PipelinePlan};
use crate::prune::CalibrationData;
use serde::Serialize;

/// Accounting change of one pass, as printed by `podar run`.
#[derive(Debug, Serialize)]
pub struct PassSummary {
    pub index: usize,
    pub pass: PassKind,
    pub storage_bytes_before: f64,
    pub storage_bytes_after: f64,
    pub storage_reduction: Reduction,
    pub conv_params_before: usize,
    pub conv_params_after: usize,
    pub parameter_reduction: Reduction,
    pub flop_reduction: Option<Reduction>,
}

impl From<&PassRecord> for PassSummary {
    fn from(record: &PassRecord) -> Self {
        let delta = record.delta();
        Self {
            index: record.index,
            pass: record.pass,
            storage_bytes_before: record.before.storage_bytes(),
            storage_bytes_after: record.after.storage_bytes(),
            storage_reduction: delta.storage_reduction(),
            conv_params_before: record.before.conv_parameters.kept,
            conv_params_after: record.after.conv_parameters.kept,
            parameter_reduction: delta.parameter_reduction(),
            flop_reduction: delta.flop_reduction(),
        }
    }
}

/// Format a pass summary as a single line
pub fn format_summary(s: &PassSummary) -> String {
    let flops = s.flop_reduction.map_or_else(|| "-".to_string(), |r| r.to_string());
    format!(
        "  [{}] {}: storage {:.1} -> {:.1} bytes ({}), conv params {} -> {} ({}), flop reduction {}",
        s.index,
        s.pass,
        s.storage_bytes_before,
        s.storage_bytes_after,
        s.storage_reduction,
        s.conv_params_before,
        s.conv_params_after,
        s.parameter_reduction,
        flops
    )
}

pub fn run_pipeline(args: RunArgs, level: LogLevel) -> Result<(), String> {
    if args.batch_size == 0 || args.calibration_batches == 0 {
        return Err("Config error: calibration needs at least one batch of one sample".to_string());
    }
    let plan = PipelinePlan::from_path(&args.plan).map_err(|e| format!("Config error: {e}"))?;
    let graph = checkpoint::load(&args.checkpoint).map_err(|e| format!("Checkpoint error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!("Loaded graph '{}' ({} nodes) from {}", graph.name(), graph.len(), args.checkpoint.display()),
    );

    let calibration =
        CalibrationData::synthetic(graph.input_shape(), args.batch_size, args.calibration_batches, args.seed);
    let mut ctx = PipelineContext::new(graph, calibration);
    let report = Pipeline::new()
        .run(&mut ctx, &plan)
        .map_err(|e| format!("Pipeline error: {e}"))?;

    if let Some(path) = &args.report {
        let json = report.to_json().map_err(|e| format!("Report error: {e}"))?;
        std::fs::write(path, json).map_err(|e| format!("Report error: {e}"))?;
        log(level, LogLevel::Verbose, &format!("Report written to {}", path.display()));
    }
    if let Some(dir) = &args.output {
        checkpoint::save(ctx.graph(), dir).map_err(|e| format!("Checkpoint error: {e}"))?;
        log(level, LogLevel::Normal, &format!("Saved compressed graph to {}", dir.display()));
    }

    let summaries: Vec<PassSummary> = report.records.iter().map(PassSummary::from).collect();
    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summaries).map_err(|e| format!("JSON error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Text => {
            log(level, LogLevel::Normal, &format!("Ran {} passes:", summaries.len()));
            for s in &summaries {
                log(level, LogLevel::Normal, &format_summary(s));
            }
            if let Some(accounting) = ctx.accounting() {
                log(level, LogLevel::Normal, "Final accounting:");
                log(level, LogLevel::Normal, &format_accounting(accounting));
            }
        }
    }
    Ok(())
}
