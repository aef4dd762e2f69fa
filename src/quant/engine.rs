//! Post-training quantization of graph weights.

use super::config::{QuantGranularity, QuantizeConfig, SelectBy};
use super::quantizer::{QuantParams, UniformQuantizer};
use crate::accounting::{storage_bits, storage_bits_at};
use crate::graph::{Graph, LayerId, QuantizationState};
use crate::mask::effective;
use crate::{Error, Result};
use ndarray::Zip;
use serde::Serialize;

/// Metadata key holding the scale(s) of a quantized layer.
pub const QUANT_SCALE: &str = "quant_scale";
/// Metadata key holding the zero point(s) of a quantized layer.
pub const QUANT_ZERO_POINT: &str = "quant_zero_point";
/// Metadata key holding the bit width of a quantized layer.
pub const QUANT_BITS: &str = "quant_bits";

/// Per-layer result of quantization.
#[derive(Debug, Clone, Serialize)]
pub struct LayerQuantization {
    pub layer: LayerId,
    pub params: Vec<QuantParams>,
    /// Largest absolute change of a live weight.
    pub max_abs_error: f32,
}

/// What one quantize pass did.
#[derive(Debug, Clone, Serialize)]
pub struct QuantizeOutcome {
    pub layers: Vec<LayerQuantization>,
    pub bits: u8,
    /// Conv storage accounted at 8 bits per kept value.
    pub storage_bits_8bit: u64,
    /// Conv storage at the configured bit width.
    pub storage_bits_configured: u64,
}

fn selected_layers(graph: &Graph, config: &QuantizeConfig) -> Result<Vec<LayerId>> {
    match config.by() {
        SelectBy::Type => {
            let ops = config.target_ops()?;
            Ok(graph
                .nodes()
                .iter()
                .filter(|n| ops.contains(&n.op()))
                .map(|n| n.id().clone())
                .collect())
        }
        SelectBy::Name => config
            .targets()
            .iter()
            .map(|t| {
                let id = LayerId::new(t.as_str());
                let node = graph.node(&id)?;
                if node.layer().weight().is_none() {
                    return Err(Error::invalid_config(
                        "targets",
                        format!("layer '{t}' carries no weights to quantize"),
                    ));
                }
                Ok(id)
            })
            .collect(),
    }
}

fn max_abs_diff(a: &crate::tensor::Tensor, b: &crate::tensor::Tensor) -> f32 {
    Zip::from(a).and(b).fold(0.0f32, |acc, &x, &y| acc.max((x - y).abs()))
}

fn record_params(graph: &mut Graph, id: &LayerId, bits: u8, params: &[QuantParams]) -> Result<()> {
    let meta = graph.metadata_mut(id)?;
    match params {
        [p] => {
            meta.insert(QUANT_SCALE, f64::from(p.scale));
            meta.insert(QUANT_ZERO_POINT, p.zero_point);
        }
        many => {
            meta.insert(QUANT_SCALE, many.iter().map(|p| f64::from(p.scale)).collect::<Vec<_>>());
            meta.insert(QUANT_ZERO_POINT, many.iter().map(|p| p.zero_point).collect::<Vec<_>>());
        }
    }
    meta.insert(QUANT_BITS, bits);
    Ok(())
}

/// Quantize the selected layers in place.
///
/// Masked layers are quantized through their stored original values with
/// the parameters calibrated on the live weight, and the live weight is
/// rewritten as `values ⊙ mask`, so pruned positions stay exactly zero.
pub fn quantize(graph: &mut Graph, config: &QuantizeConfig) -> Result<QuantizeOutcome> {
    config.validate()?;
    let ids = selected_layers(graph, config)?;

    // Stale masks are rejected before anything is rewritten.
    for id in &ids {
        let node = graph.node(id)?;
        if let (Some(weight), Some(mw)) = (node.layer().weight(), graph.masks().weight(id)) {
            if weight.shape() != mw.shape() {
                return Err(Error::MaskShapeMismatch {
                    layer: id.to_string(),
                    mask: mw.shape().to_vec(),
                    weight: weight.shape().to_vec(),
                });
            }
        }
    }

    let quantizer = UniformQuantizer::new(config.scheme(), config.bits());
    let mut layers = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(live) = graph.node(&id)?.layer().weight().cloned() else {
            continue;
        };
        let (quantized, params) = quantizer.quantize_tensor(&live, config.granularity());

        let new_live = match graph.masks_mut().weight_mut(&id) {
            Some(mw) => {
                let values = quantizer.quantize_with(mw.values(), &params);
                mw.set_values(values)?;
                effective(mw)
            }
            None => quantized,
        };
        let max_abs_error = max_abs_diff(&live, &new_live);

        let layer = graph.node_mut(&id)?.layer_mut();
        layer.set_weight(new_live)?;
        if config.quantize_bias() {
            if let Some(bias) = layer.bias_mut() {
                let (q, _) = quantizer.quantize_tensor(bias, QuantGranularity::PerTensor);
                *bias = q;
            }
        }
        record_params(graph, &id, config.bits(), &params)?;

        tracing::debug!(layer = %id, groups = params.len(), max_abs_error, "layer quantized");
        layers.push(LayerQuantization { layer: id, params, max_abs_error });
    }

    graph.set_quantization(QuantizationState::quantized(config.bits()));
    let storage_bits_8bit = storage_bits(graph, true, graph.masks())?;
    let storage_bits_configured = storage_bits_at(graph, u64::from(config.bits()), graph.masks())?;

    tracing::info!(
        layers = layers.len(),
        bits = config.bits(),
        scheme = ?config.scheme(),
        storage_bits_8bit,
        storage_bits_configured,
        "quantization complete"
    );

    Ok(QuantizeOutcome {
        layers,
        bits: config.bits(),
        storage_bits_8bit,
        storage_bits_configured,
    })
}
