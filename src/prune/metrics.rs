//! Pruning metrics collection
//!
//! Tracks what a single prune pass achieved.

use serde::{Deserialize, Serialize};

/// Metrics collected during pruning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruningMetrics {
    /// Achieved weight sparsity over all pruned layers (0.0 to 1.0).
    pub achieved_sparsity: f64,
    /// Target weight sparsity.
    pub target_sparsity: f64,
    /// Weight elements in pruned layers.
    pub total_parameters: usize,
    /// Weight elements masked out.
    pub parameters_pruned: usize,
    /// Weight elements kept.
    pub parameters_remaining: usize,
    /// Per-layer weight sparsity.
    pub layer_sparsity: Vec<(String, f64)>,
    /// Target activation sparsity.
    pub activation_target: f64,
    /// Achieved activation sparsity on the representative batch.
    pub activation_sparsity: Option<f64>,
    /// Layers skipped because they hold no parameters.
    pub skipped_layers: Vec<String>,
}

impl PruningMetrics {
    /// Create new metrics with target sparsity.
    pub fn new(target_sparsity: f64) -> Self {
        Self { target_sparsity, ..Default::default() }
    }

    /// Update achieved sparsity and parameter counts.
    pub fn update_sparsity(&mut self, pruned: usize, total: usize) {
        self.total_parameters = total;
        self.parameters_pruned = pruned;
        self.parameters_remaining = total.saturating_sub(pruned);
        self.achieved_sparsity = if total > 0 { pruned as f64 / total as f64 } else { 0.0 };
    }

    /// Add layer sparsity.
    pub fn add_layer_sparsity(&mut self, name: impl Into<String>, sparsity: f64) {
        self.layer_sparsity.push((name.into(), sparsity));
    }

    /// Get sparsity gap (target - achieved).
    pub fn sparsity_gap(&self) -> f64 {
        self.target_sparsity - self.achieved_sparsity
    }

    /// Get mean layer sparsity.
    pub fn mean_layer_sparsity(&self) -> f64 {
        if self.layer_sparsity.is_empty() {
            return self.achieved_sparsity;
        }
        let sum: f64 = self.layer_sparsity.iter().map(|(_, s)| s).sum();
        sum / self.layer_sparsity.len() as f64
    }

    /// Get sparsity variance across layers.
    pub fn layer_sparsity_variance(&self) -> f64 {
        if self.layer_sparsity.is_empty() {
            return 0.0;
        }
        let mean = self.mean_layer_sparsity();
        self.layer_sparsity.iter().map(|(_, s)| (s - mean).powi(2)).sum::<f64>()
            / self.layer_sparsity.len() as f64
    }
}
