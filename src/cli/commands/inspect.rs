//! Inspect command implementation

use crate::accounting::AccountingSnapshot;
use crate::checkpoint;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{InspectArgs, OutputFormat};
use crate::graph::{Graph, QuantizationState};
use crate::mask::SparsityReport;
use serde::Serialize;

/// Machine-readable summary of a checkpoint.
#[derive(Debug, Serialize)]
pub struct InspectSummary {
    pub name: String,
    pub input_shape: Vec<usize>,
    pub nodes: usize,
    pub parameters: usize,
    pub quantization: QuantizationState,
    pub accounting: AccountingSnapshot,
    pub sparsity: Option<SparsityReport>,
}

impl InspectSummary {
    pub fn from_graph(graph: &Graph) -> Result<Self, String> {
        let accounting = AccountingSnapshot::capture(graph).map_err(|e| format!("Accounting error: {e}"))?;
        let sparsity = (!graph.masks().is_empty()).then(|| graph.masks().sparsity_report());
        Ok(Self {
            name: graph.name().to_string(),
            input_shape: graph.input_shape().to_vec(),
            nodes: graph.len(),
            parameters: graph.parameter_count(),
            quantization: graph.quantization(),
            accounting,
            sparsity,
        })
    }
}

/// Format an accounting snapshot as indented lines
pub fn format_accounting(snapshot: &AccountingSnapshot) -> String {
    let mut lines = vec![
        format!(
            "  Storage: {:.1} bytes ({})",
            snapshot.storage_bytes(),
            if snapshot.is_quantized { "8-bit" } else { "32-bit" }
        ),
        format!(
            "  Conv parameters: {} kept of {}",
            snapshot.conv_parameters.kept, snapshot.conv_parameters.total
        ),
    ];
    match snapshot.flops {
        Some(f) => lines.push(format!("  Conv FLOPs: {} -> {} ({})", f.before, f.after, f.reduction())),
        None => lines.push("  Conv FLOPs: unavailable (no recorded shapes)".to_string()),
    }
    lines.join("\n")
}

/// Format a sparsity report, one line per layer
pub fn format_sparsity(report: &SparsityReport) -> String {
    let mut lines = vec![format!(
        "  Weight sparsity: {:.2}% ({} of {} kept)",
        report.overall_weight_sparsity() * 100.0,
        report.weight_kept(),
        report.weight_total()
    )];
    for layer in report.layers() {
        let activation = layer
            .activation_sparsity
            .map_or_else(|| "-".to_string(), |s| format!("{:.2}%", s * 100.0));
        lines.push(format!(
            "    {}: weights {:.2}%, activations {}",
            layer.layer,
            layer.weight_sparsity * 100.0,
            activation
        ));
    }
    lines.join("\n")
}

pub fn run_inspect(args: InspectArgs, level: LogLevel) -> Result<(), String> {
    let graph = checkpoint::load(&args.checkpoint).map_err(|e| format!("Checkpoint error: {e}"))?;
    let summary = InspectSummary::from_graph(&graph)?;

    if args.format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| format!("JSON error: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    log(level, LogLevel::Normal, &format!("Graph: {} (input {:?})", summary.name, summary.input_shape));
    log(
        level,
        LogLevel::Normal,
        &format!("  Nodes: {}, parameters: {}", summary.nodes, summary.parameters),
    );
    for node in graph.nodes() {
        log(
            level,
            LogLevel::Verbose,
            &format!("    {} ({}, {} params)", node.id(), node.op(), node.layer().param_count()),
        );
    }
    let quant = match summary.quantization.bits {
        Some(bits) if summary.quantization.is_quantized => format!("{bits}-bit"),
        _ => "none".to_string(),
    };
    log(level, LogLevel::Normal, &format!("  Quantization: {quant}"));
    log(level, LogLevel::Normal, &format_accounting(&summary.accounting));
    if let Some(report) = &summary.sparsity {
        log(level, LogLevel::Normal, &format_sparsity(report));
    }
    Ok(())
}
