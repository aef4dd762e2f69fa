//! The computation graph owned by the pipeline.

use super::metadata::NodeMetadata;
use super::node::{Layer, LayerId, Node, OpKind};
use crate::mask::MaskStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Whether the graph's live weights have been written back on a quantized grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizationState {
    /// Quantized values have been written into the live parameters.
    pub is_quantized: bool,
    /// Configured bit width of the last quantization pass.
    pub bits: Option<u8>,
}

impl QuantizationState {
    pub fn quantized(bits: u8) -> Self {
        Self { is_quantized: true, bits: Some(bits) }
    }
}

/// Computation graph of a model.
///
/// Nodes are kept in module traversal order; that order is also the
/// iteration order of the mask store and of every accounting function.
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    input_shape: Vec<usize>,
    nodes: Vec<Node>,
    metadata: BTreeMap<LayerId, NodeMetadata>,
    masks: MaskStore,
    quantization: QuantizationState,
}

impl Graph {
    /// Assemble a graph from already-identified nodes.
    ///
    /// `input_shape` is the per-sample input shape (without the batch dimension).
    pub fn from_parts(
        name: impl Into<String>,
        input_shape: Vec<usize>,
        nodes: Vec<(LayerId, Layer)>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut built = Vec::with_capacity(nodes.len());
        let mut metadata = BTreeMap::new();
        for (id, layer) in nodes {
            if !seen.insert(id.clone()) {
                return Err(Error::DuplicateNode { name: id.to_string() });
            }
            metadata.insert(id.clone(), NodeMetadata::new());
            built.push(Node::new(id, layer));
        }
        Ok(Self {
            name: name.into(),
            input_shape,
            nodes: built,
            metadata,
            masks: MaskStore::new(),
            quantization: QuantizationState::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-sample input shape.
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    /// Nodes in traversal order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id.
    pub fn node(&self, id: &LayerId) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|n| n.id() == id)
            .ok_or_else(|| Error::UnknownLayer { layer: id.to_string() })
    }

    /// Look up a node by id, mutably.
    pub fn node_mut(&mut self, id: &LayerId) -> Result<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.id() == id)
            .ok_or_else(|| Error::UnknownLayer { layer: id.to_string() })
    }

    /// Mutable access to every node, for collaborators such as trainers.
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Nodes of the given kind, in traversal order.
    pub fn nodes_of(&self, op: OpKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.op() == op)
    }

    /// Prunable nodes (conv2d, linear), in traversal order.
    pub fn prunable_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.op().is_prunable())
    }

    /// Metadata record of a node.
    pub fn metadata(&self, id: &LayerId) -> Option<&NodeMetadata> {
        self.metadata.get(id)
    }

    /// Mutable metadata record of a node.
    pub fn metadata_mut(&mut self, id: &LayerId) -> Result<&mut NodeMetadata> {
        self.metadata
            .get_mut(id)
            .ok_or_else(|| Error::UnknownLayer { layer: id.to_string() })
    }

    /// Replace a node's metadata record wholesale.
    pub(crate) fn set_metadata(&mut self, id: &LayerId, meta: NodeMetadata) -> Result<()> {
        *self.metadata_mut(id)? = meta;
        Ok(())
    }

    pub fn masks(&self) -> &MaskStore {
        &self.masks
    }

    pub fn masks_mut(&mut self) -> &mut MaskStore {
        &mut self.masks
    }

    pub fn quantization(&self) -> QuantizationState {
        self.quantization
    }

    pub fn is_quantized(&self) -> bool {
        self.quantization.is_quantized
    }

    pub fn set_quantization(&mut self, state: QuantizationState) {
        self.quantization = state;
    }

    /// Total parameter count over all layers.
    pub fn parameter_count(&self) -> usize {
        self.nodes.iter().map(|n| n.layer().param_count()).sum()
    }
}
