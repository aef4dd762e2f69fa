//! Tensor payloads in safetensors format.

use crate::tensor::{mask_from_vec, tensor_from_vec, Mask, Tensor};
use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::path::Path;

/// Raw little-endian payload of one named tensor.
pub(super) struct Payload {
    name: String,
    dtype: Dtype,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

impl Payload {
    pub(super) fn f32(name: impl Into<String>, tensor: &Tensor) -> Self {
        let data: Vec<f32> = tensor.iter().copied().collect();
        Self {
            name: name.into(),
            dtype: Dtype::F32,
            shape: tensor.shape().to_vec(),
            bytes: bytemuck::cast_slice(&data).to_vec(),
        }
    }

    pub(super) fn mask(name: impl Into<String>, mask: &Mask) -> Self {
        Self {
            name: name.into(),
            dtype: Dtype::U8,
            shape: mask.shape().to_vec(),
            bytes: mask.iter().map(|&keep| u8::from(keep)).collect(),
        }
    }
}

/// Write payloads to a safetensors file.
pub(super) fn write(path: &Path, payloads: &[Payload]) -> Result<()> {
    let views = payloads
        .iter()
        .map(|p| -> Result<(&str, TensorView<'_>)> {
            Ok((p.name.as_str(), TensorView::new(p.dtype, p.shape.clone(), &p.bytes)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let bytes = safetensors::serialize(views, None)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn view<'a>(tensors: &'a SafeTensors<'a>, name: &str, dtype: Dtype) -> Result<TensorView<'a>> {
    let view = tensors
        .tensor(name)
        .map_err(|e| Error::Serialization(format!("tensor '{name}': {e}")))?;
    if view.dtype() != dtype {
        return Err(Error::Serialization(format!(
            "tensor '{name}' has dtype {:?}, expected {dtype:?}",
            view.dtype()
        )));
    }
    Ok(view)
}

/// Read an F32 tensor.
pub(super) fn read_f32(tensors: &SafeTensors<'_>, name: &str) -> Result<Tensor> {
    let view = view(tensors, name, Dtype::F32)?;
    let data: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
    tensor_from_vec(view.shape(), data)
}

/// Read a U8 keep-mask.
pub(super) fn read_mask(tensors: &SafeTensors<'_>, name: &str) -> Result<Mask> {
    let view = view(tensors, name, Dtype::U8)?;
    let data: Vec<bool> = view.data().iter().map(|&b| b != 0).collect();
    mask_from_vec(view.shape(), data)
}
