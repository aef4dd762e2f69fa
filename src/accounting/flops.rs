//! FLOP accounting for convolutional layers.

use super::reduction::Reduction;
use crate::graph::{Graph, Layer, OUTPUT_SHAPE};
use crate::mask::MaskStore;
use crate::tensor::kept_fraction;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Conv FLOPs of the dense model and after activation masking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlopCount {
    pub before: u64,
    pub after: u64,
}

impl FlopCount {
    /// `after / before`, undefined for a zero baseline.
    pub fn remaining_fraction(&self) -> Option<f64> {
        (self.before > 0).then(|| self.after as f64 / self.before as f64)
    }

    /// Relative FLOP reduction.
    pub fn reduction(&self) -> Reduction {
        Reduction::from_counts(self.before as f64, self.after as f64)
    }
}

/// Conv FLOPs before and after activation masking.
///
/// Per conv layer `before = K² · H_out · W_out · C_in · C_out · 2` and
/// `after = floor(before · kept fraction of the activation mask)`. Spatial
/// dimensions come from the activation mask, or from the node's
/// `output_shape` metadata when nothing has been pruned yet. Convs without
/// parameters are never pruned and contribute no FLOPs.
///
/// The activation mask is captured from one representative batch; using it
/// for all inputs is an approximation.
pub fn flops(graph: &Graph, masks: &MaskStore) -> Result<FlopCount> {
    let masked = masks.weight_count() > 0 || masks.activation_count() > 0;
    if masked {
        masks.check_counts()?;
    }

    let mut count = FlopCount::default();
    for node in graph.nodes() {
        let Layer::Conv2d(conv) = node.layer() else {
            continue;
        };
        if conv.weight().is_empty() {
            continue;
        }

        let (c_out, c_in, k) = match masks.weight(node.id()) {
            Some(mw) => {
                let s = mw.shape();
                if s != conv.weight().shape() {
                    return Err(Error::MaskShapeMismatch {
                        layer: node.id().to_string(),
                        mask: s.to_vec(),
                        weight: conv.weight().shape().to_vec(),
                    });
                }
                (s[0], s[1], s[2])
            }
            None => (conv.out_channels(), conv.in_channels(), conv.kernel_size()),
        };

        let (h_out, w_out, fraction) = match masks.activation(node.id()) {
            Some(mask) => {
                let s = mask.shape();
                if s.len() < 2 {
                    return Err(Error::shape_mismatch(
                        format!("activation mask of {}", node.id()),
                        &[0, 0, 0, 0],
                        s,
                    ));
                }
                (s[s.len() - 2], s[s.len() - 1], kept_fraction(mask))
            }
            None if masked => {
                return Err(Error::MissingMask {
                    layer: node.id().to_string(),
                    kind: "activation".to_string(),
                });
            }
            None => {
                let shape = graph
                    .metadata(node.id())
                    .and_then(|m| m.shape(OUTPUT_SHAPE))
                    .filter(|s| s.len() >= 2)
                    .ok_or_else(|| Error::MissingShape { layer: node.id().to_string() })?;
                (shape[shape.len() - 2], shape[shape.len() - 1], 1.0)
            }
        };

        let layer_before = (k * k * h_out * w_out * c_in * c_out * 2) as u64;
        let layer_after = (layer_before as f64 * fraction).floor() as u64;
        tracing::debug!(
            layer = %node.id(),
            before = layer_before,
            after = layer_after,
            "conv flops"
        );
        count.before += layer_before;
        count.after += layer_after;
    }
    Ok(count)
}
