//! Sparsity reports derived from the mask store.

use crate::graph::LayerId;
use serde::{Deserialize, Serialize};

fn ratio_masked(total: usize, kept: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (total - kept) as f64 / total as f64
    }
}

/// Sparsity of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSparsity {
    /// Layer the masks belong to.
    pub layer: LayerId,
    /// Weight elements.
    pub weight_total: usize,
    /// Weight elements kept.
    pub weight_kept: usize,
    /// Fraction of weights masked out.
    pub weight_sparsity: f64,
    /// Activation elements, when an activation mask exists.
    pub activation_total: Option<usize>,
    /// Activation elements kept.
    pub activation_kept: Option<usize>,
    /// Fraction of activations masked out.
    pub activation_sparsity: Option<f64>,
}

impl LayerSparsity {
    pub(crate) fn new(
        layer: LayerId,
        weight_total: usize,
        weight_kept: usize,
        activation: Option<(usize, usize)>,
    ) -> Self {
        Self {
            layer,
            weight_total,
            weight_kept,
            weight_sparsity: ratio_masked(weight_total, weight_kept),
            activation_total: activation.map(|(t, _)| t),
            activation_kept: activation.map(|(_, k)| k),
            activation_sparsity: activation.map(|(t, k)| ratio_masked(t, k)),
        }
    }
}

/// Aggregated sparsity over all masked layers.
///
/// Read-only once built; callers consume it for logging and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparsityReport {
    layers: Vec<LayerSparsity>,
    weight_total: usize,
    weight_kept: usize,
    activation_total: usize,
    activation_kept: usize,
}

impl SparsityReport {
    pub(crate) fn from_layers(layers: Vec<LayerSparsity>) -> Self {
        let weight_total = layers.iter().map(|l| l.weight_total).sum();
        let weight_kept = layers.iter().map(|l| l.weight_kept).sum();
        let activation_total = layers.iter().filter_map(|l| l.activation_total).sum();
        let activation_kept = layers.iter().filter_map(|l| l.activation_kept).sum();
        Self { layers, weight_total, weight_kept, activation_total, activation_kept }
    }

    /// Per-layer entries in traversal order.
    pub fn layers(&self) -> &[LayerSparsity] {
        &self.layers
    }

    /// Entry for one layer.
    pub fn layer(&self, id: &LayerId) -> Option<&LayerSparsity> {
        self.layers.iter().find(|l| &l.layer == id)
    }

    pub fn weight_total(&self) -> usize {
        self.weight_total
    }

    pub fn weight_kept(&self) -> usize {
        self.weight_kept
    }

    /// Weight sparsity over all masked layers.
    pub fn overall_weight_sparsity(&self) -> f64 {
        ratio_masked(self.weight_total, self.weight_kept)
    }

    /// Activation sparsity over all layers with an activation mask.
    pub fn overall_activation_sparsity(&self) -> Option<f64> {
        (self.activation_total > 0).then(|| ratio_masked(self.activation_total, self.activation_kept))
    }
}
