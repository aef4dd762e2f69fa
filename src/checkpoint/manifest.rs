//! `graph.json`: graph structure, metadata and quantization state.

use crate::graph::{Graph, Layer, LayerId, NodeMetadata, OpKind, QuantizationState};
use serde::{Deserialize, Serialize};

/// Manifest format version written by [`super::save`].
pub const FORMAT_VERSION: u32 = 1;

/// Structure of one node; tensors live in the safetensors files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeManifest {
    pub id: LayerId,
    pub op: OpKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<usize>,
    #[serde(default)]
    pub has_bias: bool,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

/// Contents of `graph.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphManifest {
    pub format_version: u32,
    pub name: String,
    pub input_shape: Vec<usize>,
    pub quantization: QuantizationState,
    pub nodes: Vec<NodeManifest>,
    /// Layers with a weight mask, in mask store order.
    pub weight_masks: Vec<LayerId>,
    /// Layers with an activation mask, in mask store order.
    pub activation_masks: Vec<LayerId>,
}

impl GraphManifest {
    pub fn from_graph(graph: &Graph) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| {
                let (stride, padding, kernel) = match node.layer() {
                    Layer::Conv2d(c) => (Some(c.stride()), Some(c.padding()), None),
                    Layer::MaxPool2d { kernel } => (None, None, Some(*kernel)),
                    _ => (None, None, None),
                };
                NodeManifest {
                    id: node.id().clone(),
                    op: node.op(),
                    stride,
                    padding,
                    kernel,
                    has_bias: node.layer().bias().is_some(),
                    metadata: graph.metadata(node.id()).cloned().unwrap_or_default(),
                }
            })
            .collect();
        Self {
            format_version: FORMAT_VERSION,
            name: graph.name().to_string(),
            input_shape: graph.input_shape().to_vec(),
            quantization: graph.quantization(),
            nodes,
            weight_masks: graph.masks().weights().map(|(id, _)| id.clone()).collect(),
            activation_masks: graph.masks().activations().map(|(id, _)| id.clone()).collect(),
        }
    }
}
