//! # Podar: pass pipeline for neural network compression
//!
//! Podar compresses a trained model by running an ordered list of passes
//! over one mutable computation graph:
//!
//! - **prune**: magnitude or random weight masks, activation masks from calibration
//! - **quantize**: symmetric, asymmetric or fixed-point grids, per tensor or per channel
//! - **retrain**: an external [`Trainer`](pipeline::Trainer), with static masks re-applied afterwards
//! - **huffman**: lossless entropy coding of quantized weights
//!
//! Masks and quantization state are first-class metadata of the [`Graph`](graph::Graph),
//! and every mutating pass is bracketed by storage, parameter and FLOP accounting.
//!
//! # Example
//!
//! ```ignore
//! use podar::pipeline::{Pipeline, PipelineContext, PipelinePlan};
//! use podar::prune::CalibrationData;
//!
//! let graph = podar::checkpoint::load("model")?;
//! let calibration = CalibrationData::synthetic(graph.input_shape(), 8, 1, 0);
//! let plan = PipelinePlan::from_path("plan.yaml")?;
//! let mut ctx = PipelineContext::new(graph, calibration);
//! let report = Pipeline::new().run(&mut ctx, &plan)?;
//! ```

pub mod accounting;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod huffman;
pub mod mask;
pub mod pipeline;
pub mod prune;
pub mod quant;
pub mod tensor;

#[cfg(test)]
mod test_support;

pub use error::{Error, ErrorClass, Result};
