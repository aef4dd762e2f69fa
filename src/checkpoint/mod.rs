//! Graph checkpoints
//!
//! A checkpoint directory holds:
//! - `graph.json`: structure, node metadata, quantization state and mask order
//! - `parameters.safetensors`: live weights and biases (`<layer>.weight`, `<layer>.bias`)
//! - `masks.safetensors`: keep-masks as U8, original values of pruned layers as F32
//!   and activation masks

mod manifest;
mod tensors;

#[cfg(test)]
mod tests;

pub use manifest::{GraphManifest, NodeManifest, FORMAT_VERSION};

use crate::graph::{Conv2d, Graph, Layer, LayerId, Linear, OpKind};
use crate::mask::MaskedWeight;
use crate::tensor::Tensor;
use crate::{Error, Result};
use safetensors::SafeTensors;
use std::path::{Path, PathBuf};
use tensors::{read_f32, read_mask, Payload};

pub const GRAPH_FILE: &str = "graph.json";
pub const PARAMETERS_FILE: &str = "parameters.safetensors";
pub const MASKS_FILE: &str = "masks.safetensors";

fn weight_key(id: &LayerId) -> String {
    format!("{id}.weight")
}

fn bias_key(id: &LayerId) -> String {
    format!("{id}.bias")
}

fn mask_key(id: &LayerId) -> String {
    format!("{id}.weight_mask")
}

fn values_key(id: &LayerId) -> String {
    format!("{id}.weight_values")
}

fn activation_key(id: &LayerId) -> String {
    format!("{id}.activation_mask")
}

/// Save `graph` with its masks and quantization state into `dir`.
pub fn save(graph: &Graph, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let manifest = GraphManifest::from_graph(graph);
    std::fs::write(dir.join(GRAPH_FILE), serde_json::to_string_pretty(&manifest)?)?;

    let mut parameters = Vec::new();
    for node in graph.nodes() {
        if let Some(w) = node.layer().weight() {
            parameters.push(Payload::f32(weight_key(node.id()), w));
        }
        if let Some(b) = node.layer().bias() {
            parameters.push(Payload::f32(bias_key(node.id()), b));
        }
    }
    tensors::write(&dir.join(PARAMETERS_FILE), &parameters)?;

    let mut masks = Vec::new();
    for (id, mw) in graph.masks().weights() {
        masks.push(Payload::mask(mask_key(id), mw.mask()));
        masks.push(Payload::f32(values_key(id), mw.values()));
    }
    for (id, mask) in graph.masks().activations() {
        masks.push(Payload::mask(activation_key(id), mask));
    }
    tensors::write(&dir.join(MASKS_FILE), &masks)?;

    tracing::debug!(
        dir = %dir.display(),
        nodes = manifest.nodes.len(),
        weight_masks = manifest.weight_masks.len(),
        "checkpoint written"
    );
    Ok(())
}

fn read_file(path: PathBuf) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::CheckpointNotFound { path });
    }
    Ok(std::fs::read(path)?)
}

fn rebuild_layer(node: &manifest::NodeManifest, params: &SafeTensors<'_>) -> Result<Layer> {
    let bias = |id: &LayerId| -> Result<Option<Tensor>> {
        if node.has_bias {
            read_f32(params, &bias_key(id)).map(Some)
        } else {
            Ok(None)
        }
    };
    Ok(match node.op {
        OpKind::Conv2d => {
            let conv = Conv2d::new(read_f32(params, &weight_key(&node.id))?, bias(&node.id)?)?
                .with_stride(node.stride.unwrap_or(1))
                .with_padding(node.padding.unwrap_or(0));
            Layer::Conv2d(conv)
        }
        OpKind::Linear => {
            Layer::Linear(Linear::new(read_f32(params, &weight_key(&node.id))?, bias(&node.id)?)?)
        }
        OpKind::Relu => Layer::Relu,
        OpKind::Flatten => Layer::Flatten,
        OpKind::MaxPool2d => Layer::MaxPool2d {
            kernel: node.kernel.ok_or_else(|| {
                Error::Serialization(format!("max_pool2d node '{}' has no kernel", node.id))
            })?,
        },
    })
}

/// Load a graph saved by [`save`].
pub fn load(dir: impl AsRef<Path>) -> Result<Graph> {
    let dir = dir.as_ref();
    let manifest: GraphManifest = serde_json::from_slice(&read_file(dir.join(GRAPH_FILE))?)?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::Serialization(format!(
            "unsupported checkpoint format version {}",
            manifest.format_version
        )));
    }

    let param_bytes = read_file(dir.join(PARAMETERS_FILE))?;
    let params = SafeTensors::deserialize(&param_bytes)?;
    let nodes = manifest
        .nodes
        .iter()
        .map(|n| -> Result<(LayerId, Layer)> { Ok((n.id.clone(), rebuild_layer(n, &params)?)) })
        .collect::<Result<Vec<_>>>()?;

    let mut graph = Graph::from_parts(manifest.name.clone(), manifest.input_shape.clone(), nodes)?;
    for node in &manifest.nodes {
        graph.set_metadata(&node.id, node.metadata.clone())?;
    }
    graph.set_quantization(manifest.quantization);

    let mask_bytes = read_file(dir.join(MASKS_FILE))?;
    let masks = SafeTensors::deserialize(&mask_bytes)?;
    for id in &manifest.weight_masks {
        let mw = MaskedWeight::new(read_f32(&masks, &values_key(id))?, read_mask(&masks, &mask_key(id))?)?;
        graph.masks_mut().insert_weight(id.clone(), mw);
    }
    for id in &manifest.activation_masks {
        graph.masks_mut().insert_activation(id.clone(), read_mask(&masks, &activation_key(id))?);
    }

    tracing::debug!(dir = %dir.display(), nodes = graph.len(), "checkpoint loaded");
    Ok(graph)
}
