//! Computation graph of a model.
//!
//! A [`Graph`] is the single mutable representation every pass works on:
//! ordered nodes with canonical [`LayerId`]s, a metadata record per node,
//! the [`MaskStore`](crate::mask::MaskStore) and the quantization state.

mod builder;
mod forward;
mod metadata;
mod model;
mod node;


pub use builder::GraphBuilder;
pub use forward::{annotate_shapes, check_input, forward, forward_trace};
pub use metadata::{NodeMetadata, INPUT_SHAPE, OUTPUT_SHAPE};
pub use model::{Graph, QuantizationState};
pub use node::{Conv2d, Layer, LayerId, Linear, Node, OpKind};
