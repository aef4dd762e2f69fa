//! Entropy coding of quantized graph weights.

use super::bitstream::BitStream;
use super::codebook::Codebook;
use super::codec::{decode, encode};
use crate::accounting::{Reduction, FULL_PRECISION_BITS};
use crate::graph::{Graph, LayerId, Node, OpKind};
use crate::quant::QUANT_BITS;
use crate::tensor::{tensor_from_vec, Tensor};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which layers share a codebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// One codebook per layer.
    #[default]
    PerLayer,
    /// One codebook for all encoded layers.
    Global,
}

/// Configuration of one `huffman` pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HuffmanConfig {
    enabled: bool,
    pooling: Pooling,
    targets: Vec<OpKind>,
    verify: bool,
}

impl Default for HuffmanConfig {
    fn default() -> Self {
        Self { enabled: true, pooling: Pooling::default(), targets: vec![OpKind::Conv2d], verify: true }
    }
}

impl HuffmanConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_pooling(mut self, pooling: Pooling) -> Self {
        self.pooling = pooling;
        self
    }

    pub fn with_targets(mut self, targets: &[OpKind]) -> Self {
        self.targets = targets.to_vec();
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn pooling(&self) -> Pooling {
        self.pooling
    }

    pub fn targets(&self) -> &[OpKind] {
        &self.targets
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(op) = self.targets.iter().find(|op| !op.is_prunable()) {
            return Err(Error::invalid_config(
                "targets",
                format!("'{op}' layers carry no weights to encode"),
            ));
        }
        Ok(())
    }
}

/// One encoded weight tensor.
#[derive(Debug, Clone, Serialize)]
pub struct EncodedLayer {
    pub layer: LayerId,
    pub shape: Vec<usize>,
    /// Index into [`HuffmanOutcome::codebooks`].
    pub codebook: usize,
    pub stream: BitStream,
}

/// Codebooks and bitstreams of a huffman pass.
///
/// Symbols are the IEEE-754 bit patterns of the quantized weights.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HuffmanOutcome {
    pub pooling: Pooling,
    pub codebooks: Vec<Codebook<u32>>,
    pub layers: Vec<EncodedLayer>,
}

impl HuffmanOutcome {
    /// Number of encoded weights.
    pub fn symbol_count(&self) -> usize {
        self.layers.iter().map(|l| l.shape.iter().product::<usize>()).sum()
    }

    /// Bits of the encoded streams.
    pub fn encoded_bits(&self) -> u64 {
        self.layers.iter().map(|l| l.stream.len() as u64).sum()
    }

    /// Bits of the same weights at full precision.
    pub fn raw_bits(&self) -> u64 {
        self.symbol_count() as u64 * FULL_PRECISION_BITS
    }

    /// Reduction of the encoded size relative to full precision.
    pub fn reduction(&self) -> Reduction {
        Reduction::between(self.raw_bits(), self.encoded_bits())
    }
}

/// A targeted layer must carry the bit width its quantization recorded.
fn check_layer_quantized(graph: &Graph, node: &Node) -> Result<()> {
    let quantized = graph
        .metadata(node.id())
        .and_then(|m| m.get_f64(QUANT_BITS))
        .is_some();
    if quantized {
        Ok(())
    } else {
        Err(Error::LayerNotQuantized { layer: node.id().to_string() })
    }
}

fn layer_symbols(id: &LayerId, weight: &Tensor) -> Result<Vec<u32>> {
    weight
        .iter()
        .map(|&v| {
            if v.is_finite() {
                Ok(v.to_bits())
            } else {
                Err(Error::NonFiniteSymbol { layer: id.to_string(), value: v })
            }
        })
        .collect()
}

/// Huffman-encode the live weights of the targeted layers.
///
/// The graph must be quantized so that the symbol set is finite, and every
/// targeted layer with parameters must have been quantized itself. With
/// `verify`, every stream is decoded again and compared bit for bit.
pub fn huffman_encode(graph: &Graph, config: &HuffmanConfig) -> Result<HuffmanOutcome> {
    if !config.enabled() {
        tracing::info!("huffman coding disabled");
        return Ok(HuffmanOutcome { pooling: config.pooling(), ..Default::default() });
    }
    config.validate()?;
    if !graph.is_quantized() {
        return Err(Error::NotQuantized);
    }

    let mut inputs: Vec<(LayerId, Vec<usize>, Vec<u32>)> = Vec::new();
    for node in graph.nodes().iter().filter(|n| config.targets().contains(&n.op())) {
        let Some(weight) = node.layer().weight() else {
            continue;
        };
        if !weight.is_empty() {
            check_layer_quantized(graph, node)?;
        }
        inputs.push((node.id().clone(), weight.shape().to_vec(), layer_symbols(node.id(), weight)?));
    }

    let codebooks = match config.pooling() {
        Pooling::PerLayer => inputs.iter().map(|(_, _, s)| Codebook::build(s)).collect(),
        Pooling::Global => {
            let all: Vec<u32> = inputs.iter().flat_map(|(_, _, s)| s.iter().copied()).collect();
            vec![Codebook::build(&all)]
        }
    };

    let mut layers = Vec::with_capacity(inputs.len());
    for (i, (layer, shape, symbols)) in inputs.into_iter().enumerate() {
        let book = match config.pooling() {
            Pooling::PerLayer => i,
            Pooling::Global => 0,
        };
        let stream = encode(&codebooks[book], &symbols)?;
        if config.verify() && decode(&codebooks[book], &stream)? != symbols {
            return Err(Error::RoundTripMismatch { layer: layer.to_string() });
        }
        tracing::debug!(
            layer = %layer,
            symbols = symbols.len(),
            alphabet = codebooks[book].len(),
            max_code_len = codebooks[book].max_code_len(),
            bits = stream.len(),
            "layer encoded"
        );
        layers.push(EncodedLayer { layer, shape, codebook: book, stream });
    }

    let outcome = HuffmanOutcome { pooling: config.pooling(), codebooks, layers };
    tracing::info!(
        layers = outcome.layers.len(),
        raw_bits = outcome.raw_bits(),
        encoded_bits = outcome.encoded_bits(),
        reduction = %outcome.reduction(),
        "huffman coding complete"
    );
    Ok(outcome)
}

/// Recover the weight tensors from an outcome of [`huffman_encode`].
pub fn decode_layers(outcome: &HuffmanOutcome) -> Result<Vec<(LayerId, Tensor)>> {
    outcome
        .layers
        .iter()
        .map(|l| {
            let book = outcome
                .codebooks
                .get(l.codebook)
                .ok_or_else(|| Error::UnknownLayer { layer: format!("codebook #{}", l.codebook) })?;
            let values: Vec<f32> = decode(book, &l.stream)?.into_iter().map(f32::from_bits).collect();
            Ok((l.layer.clone(), tensor_from_vec(&l.shape, values)?))
        })
        .collect()
}
