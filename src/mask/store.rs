//! Per-layer mask storage.

use super::masked_weight::MaskedWeight;
use super::report::{LayerSparsity, SparsityReport};
use crate::graph::LayerId;
use crate::tensor::{count_kept, Mask};
use crate::{Error, Result};

/// Weight masks (static) and activation masks (dynamic) keyed by layer.
///
/// Entries keep insertion order, which the pruning engine makes equal to
/// module traversal order.
#[derive(Debug, Clone, Default)]
pub struct MaskStore {
    weights: Vec<(LayerId, MaskedWeight)>,
    activations: Vec<(LayerId, Mask)>,
}

impl MaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the weight decomposition of a layer.
    pub fn insert_weight(&mut self, id: LayerId, weight: MaskedWeight) {
        match self.weights.iter_mut().find(|(k, _)| *k == id) {
            Some((_, slot)) => *slot = weight,
            None => self.weights.push((id, weight)),
        }
    }

    /// Insert or replace the activation mask of a layer.
    pub fn insert_activation(&mut self, id: LayerId, mask: Mask) {
        match self.activations.iter_mut().find(|(k, _)| *k == id) {
            Some((_, slot)) => *slot = mask,
            None => self.activations.push((id, mask)),
        }
    }

    pub fn weight(&self, id: &LayerId) -> Option<&MaskedWeight> {
        self.weights.iter().find(|(k, _)| k == id).map(|(_, w)| w)
    }

    pub fn weight_mut(&mut self, id: &LayerId) -> Option<&mut MaskedWeight> {
        self.weights.iter_mut().find(|(k, _)| k == id).map(|(_, w)| w)
    }

    pub fn activation(&self, id: &LayerId) -> Option<&Mask> {
        self.activations.iter().find(|(k, _)| k == id).map(|(_, m)| m)
    }

    /// Weight entries in insertion order.
    pub fn weights(&self) -> impl Iterator<Item = (&LayerId, &MaskedWeight)> {
        self.weights.iter().map(|(k, w)| (k, w))
    }

    /// Activation entries in insertion order.
    pub fn activations(&self) -> impl Iterator<Item = (&LayerId, &Mask)> {
        self.activations.iter().map(|(k, m)| (k, m))
    }

    pub fn weight_count(&self) -> usize {
        self.weights.len()
    }

    pub fn activation_count(&self) -> usize {
        self.activations.len()
    }

    /// True when no layer has been masked.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty() && self.activations.is_empty()
    }

    /// Drop all activation masks (they are per-input and may be recaptured).
    pub fn clear_activations(&mut self) {
        self.activations.clear();
    }

    /// Fail unless there is exactly one activation mask per weight mask.
    pub fn check_counts(&self) -> Result<()> {
        if self.weights.len() != self.activations.len() {
            return Err(Error::MaskCountMismatch {
                weight_masks: self.weights.len(),
                activation_masks: self.activations.len(),
            });
        }
        Ok(())
    }

    /// Aggregate per-layer and overall sparsity.
    pub fn sparsity_report(&self) -> SparsityReport {
        let layers = self
            .weights
            .iter()
            .map(|(id, w)| {
                let activation = self.activation(id);
                LayerSparsity::new(
                    id.clone(),
                    w.total(),
                    w.kept(),
                    activation.map(|m| (m.len(), count_kept(m))),
                )
            })
            .collect();
        SparsityReport::from_layers(layers)
    }
}
