//! Post-training quantization
//!
//! Maps layer weights onto a reduced-precision grid and writes the
//! dequantized values back in place:
//! - Symmetric, asymmetric and fixed-point schemes
//! - Per-tensor or per-channel scales
//! - Mask-aware write-back for pruned layers

mod config;
mod engine;
mod quantizer;

#[cfg(test)]
mod tests;

pub use config::{QuantGranularity, QuantScheme, QuantizeConfig, SelectBy, MAX_BITS, MIN_BITS};
pub use engine::{quantize, LayerQuantization, QuantizeOutcome, QUANT_BITS, QUANT_SCALE, QUANT_ZERO_POINT};
pub use quantizer::{QuantParams, UniformQuantizer};
