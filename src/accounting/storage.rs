//! Storage and parameter accounting for convolutional layers.

use crate::graph::{Graph, Node, OpKind};
use crate::mask::MaskStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bit width of an unquantized parameter.
pub const FULL_PRECISION_BITS: u64 = 32;

/// Bit width of a parameter once the graph is quantized.
pub const QUANTIZED_BITS: u64 = 8;

/// Conv parameter counts before and after masking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterCount {
    /// Weights and biases of every conv layer.
    pub total: usize,
    /// Unmasked weights plus biases.
    pub kept: usize,
}

/// Kept weight elements of a conv node, validating any mask against the live weight.
fn kept_weights(node: &Node, masks: &MaskStore) -> Result<(usize, usize)> {
    let Some(weight) = node.layer().weight() else {
        return Ok((0, 0));
    };
    match masks.weight(node.id()) {
        Some(mw) => {
            if mw.shape() != weight.shape() {
                return Err(Error::MaskShapeMismatch {
                    layer: node.id().to_string(),
                    mask: mw.shape().to_vec(),
                    weight: weight.shape().to_vec(),
                });
            }
            Ok((weight.len(), mw.kept()))
        }
        None => Ok((weight.len(), weight.len())),
    }
}

fn bias_len(node: &Node) -> usize {
    node.layer().bias().map_or(0, |b| b.len())
}

/// Storage in bits of all conv layers: 8 bits per value if quantized, 32 otherwise.
///
/// Masked layers contribute only their kept weights. Conv biases are always
/// counted; biases of other layers are not.
pub fn storage_bits(graph: &Graph, is_quantized: bool, masks: &MaskStore) -> Result<u64> {
    let width = if is_quantized { QUANTIZED_BITS } else { FULL_PRECISION_BITS };
    storage_bits_at(graph, width, masks)
}

/// Storage in bits of all conv layers at an explicit bit width.
pub fn storage_bits_at(graph: &Graph, bit_width: u64, masks: &MaskStore) -> Result<u64> {
    let mut total = 0u64;
    for node in graph.nodes_of(OpKind::Conv2d) {
        let (_, kept) = kept_weights(node, masks)?;
        total += (kept + bias_len(node)) as u64 * bit_width;
    }
    Ok(total)
}

/// Convert a bit count to bytes.
pub fn bits_to_bytes(bits: u64) -> f64 {
    bits as f64 / 8.0
}

/// Conv parameter count (weights and biases), total and unmasked.
pub fn conv_parameter_count(graph: &Graph, masks: &MaskStore) -> Result<ParameterCount> {
    let mut count = ParameterCount::default();
    for node in graph.nodes_of(OpKind::Conv2d) {
        let (total, kept) = kept_weights(node, masks)?;
        let bias = bias_len(node);
        count.total += total + bias;
        count.kept += kept + bias;
    }
    Ok(count)
}
