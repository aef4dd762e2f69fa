//! Per-node sparsity annotations.

use crate::graph::Graph;
use crate::mask::SparsityReport;
use crate::Result;

/// Metadata key holding a layer's weight sparsity.
pub const WEIGHT_SPARSITY: &str = "weight_sparsity";
/// Metadata key holding a layer's activation sparsity.
pub const ACTIVATION_SPARSITY: &str = "activation_sparsity";
/// Metadata key holding a layer's kept weight count.
pub const WEIGHT_KEPT: &str = "weight_kept";

/// Compute the sparsity report and record it in each masked node's metadata.
///
/// Fails when the number of activation masks differs from the number of
/// weight masks.
pub fn add_pruning_metadata(graph: &mut Graph) -> Result<SparsityReport> {
    graph.masks().check_counts()?;
    let report = graph.masks().sparsity_report();
    for layer in report.layers() {
        let meta = graph.metadata_mut(&layer.layer)?;
        meta.insert(WEIGHT_SPARSITY, layer.weight_sparsity);
        meta.insert(WEIGHT_KEPT, layer.weight_kept);
        if let Some(s) = layer.activation_sparsity {
            meta.insert(ACTIVATION_SPARSITY, s);
        }
    }
    tracing::info!(
        layers = report.layers().len(),
        weight_sparsity = report.overall_weight_sparsity(),
        activation_sparsity = ?report.overall_activation_sparsity(),
        "sparsity report"
    );
    Ok(report)
}
