//! Graph nodes, canonical layer identifiers and parameterised layers.

use crate::tensor::Tensor;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical layer identifier.
///
/// Minted once from the module hierarchy when the graph is built
/// (`features.0`, `classifier.2`) and carried unchanged through every pass.
/// Mask store entries and accounting results are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Wrap an existing canonical identifier (e.g. one read from a config or checkpoint).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint an identifier from module path segments.
    pub(crate) fn from_path<S: AsRef<str>>(segments: &[S]) -> Self {
        let joined = segments.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(".");
        Self(joined)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Operation kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// 2D convolution.
    Conv2d,
    /// Fully connected layer.
    Linear,
    /// Rectified linear unit.
    Relu,
    /// Flatten all non-batch dimensions.
    Flatten,
    /// Non-overlapping 2D max pooling.
    MaxPool2d,
}

impl OpKind {
    /// Whether layers of this kind carry weights that can be pruned.
    pub fn is_prunable(&self) -> bool {
        matches!(self, OpKind::Conv2d | OpKind::Linear)
    }

    /// Config/display name.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Conv2d => "conv2d",
            OpKind::Linear => "linear",
            OpKind::Relu => "relu",
            OpKind::Flatten => "flatten",
            OpKind::MaxPool2d => "max_pool2d",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 2D convolution with weight `[C_out, C_in, K, K]`.
#[derive(Debug, Clone)]
pub struct Conv2d {
    weight: Tensor,
    bias: Option<Tensor>,
    stride: usize,
    padding: usize,
}

impl Conv2d {
    /// Create a convolution, validating weight rank, square kernel and bias length.
    pub fn new(weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        let shape = weight.shape().to_vec();
        if shape.len() != 4 || shape[2] != shape[3] {
            return Err(Error::shape_mismatch("conv2d weight [C_out, C_in, K, K]", &[0, 0, 0, 0], &shape));
        }
        if let Some(b) = &bias {
            if b.shape() != [shape[0]] {
                return Err(Error::shape_mismatch("conv2d bias", &[shape[0]], b.shape()));
            }
        }
        Ok(Self { weight, bias, stride: 1, padding: 0 })
    }

    /// Set the stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Set symmetric zero padding.
    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    pub fn out_channels(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn in_channels(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn kernel_size(&self) -> usize {
        self.weight.shape()[2]
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }
}

/// Fully connected layer with weight `[out, in]`.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Linear {
    /// Create a linear layer, validating weight rank and bias length.
    pub fn new(weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        let shape = weight.shape().to_vec();
        if shape.len() != 2 {
            return Err(Error::shape_mismatch("linear weight [out, in]", &[0, 0], &shape));
        }
        if let Some(b) = &bias {
            if b.shape() != [shape[0]] {
                return Err(Error::shape_mismatch("linear bias", &[shape[0]], b.shape()));
            }
        }
        Ok(Self { weight, bias })
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }
}

/// The parameterised module a node refers to.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv2d(Conv2d),
    Linear(Linear),
    Relu,
    Flatten,
    MaxPool2d { kernel: usize },
}

impl Layer {
    /// Operation kind of this layer.
    pub fn op(&self) -> OpKind {
        match self {
            Layer::Conv2d(_) => OpKind::Conv2d,
            Layer::Linear(_) => OpKind::Linear,
            Layer::Relu => OpKind::Relu,
            Layer::Flatten => OpKind::Flatten,
            Layer::MaxPool2d { .. } => OpKind::MaxPool2d,
        }
    }

    /// Live weight tensor, if the layer has one.
    pub fn weight(&self) -> Option<&Tensor> {
        match self {
            Layer::Conv2d(c) => Some(&c.weight),
            Layer::Linear(l) => Some(&l.weight),
            _ => None,
        }
    }

    /// Mutable live weight tensor.
    pub fn weight_mut(&mut self) -> Option<&mut Tensor> {
        match self {
            Layer::Conv2d(c) => Some(&mut c.weight),
            Layer::Linear(l) => Some(&mut l.weight),
            _ => None,
        }
    }

    /// Bias tensor, if present.
    pub fn bias(&self) -> Option<&Tensor> {
        match self {
            Layer::Conv2d(c) => c.bias.as_ref(),
            Layer::Linear(l) => l.bias.as_ref(),
            _ => None,
        }
    }

    /// Mutable bias tensor.
    pub fn bias_mut(&mut self) -> Option<&mut Tensor> {
        match self {
            Layer::Conv2d(c) => c.bias.as_mut(),
            Layer::Linear(l) => l.bias.as_mut(),
            _ => None,
        }
    }

    /// Overwrite the live weight, keeping the shape.
    pub fn set_weight(&mut self, weight: Tensor) -> Result<()> {
        let slot = self
            .weight_mut()
            .ok_or_else(|| Error::shape_mismatch("set_weight on parameter-free layer", &[], weight.shape()))?;
        if slot.shape() != weight.shape() {
            return Err(Error::shape_mismatch("set_weight", slot.shape(), weight.shape()));
        }
        *slot = weight;
        Ok(())
    }

    /// Total number of parameters (weight and bias).
    pub fn param_count(&self) -> usize {
        self.weight().map_or(0, |w| w.len()) + self.bias().map_or(0, |b| b.len())
    }
}

/// One operation in the graph.
#[derive(Debug, Clone)]
pub struct Node {
    id: LayerId,
    layer: Layer,
}

impl Node {
    pub(crate) fn new(id: LayerId, layer: Layer) -> Self {
        Self { id, layer }
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn op(&self) -> OpKind {
        self.layer.op()
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut Layer {
        &mut self.layer
    }
}
