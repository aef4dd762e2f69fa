//! Uniform quantize-dequantize of weight tensors.

use super::config::{QuantGranularity, QuantScheme};
use crate::tensor::Tensor;
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Scale and zero point of one quantization group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl Default for QuantParams {
    fn default() -> Self {
        Self { scale: 1.0, zero_point: 0 }
    }
}

/// Quantizer for one scheme and bit width.
///
/// Every scheme maps 0.0 to exactly 0.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformQuantizer {
    scheme: QuantScheme,
    qmin: i32,
    qmax: i32,
}

impl UniformQuantizer {
    /// Symmetric 4-bit: qmin=-7, qmax=7; asymmetric 8-bit: qmin=0, qmax=255;
    /// fixed point 8-bit: qmin=-128, qmax=127.
    pub fn new(scheme: QuantScheme, bits: u8) -> Self {
        let bits = u32::from(bits);
        let (qmin, qmax) = match scheme {
            QuantScheme::Symmetric => {
                let qmax = (1i32 << (bits - 1)) - 1;
                (-qmax, qmax)
            }
            QuantScheme::Asymmetric => (0, (1i32 << bits) - 1),
            QuantScheme::FixedPoint { .. } => (-(1i32 << (bits - 1)), (1i32 << (bits - 1)) - 1),
        };
        Self { scheme, qmin, qmax }
    }

    pub fn qmin(&self) -> i32 {
        self.qmin
    }

    pub fn qmax(&self) -> i32 {
        self.qmax
    }

    /// Min-max calibration over finite values.
    ///
    /// For symmetric: scale = max(|min|, |max|) / qmax
    /// For asymmetric: scale = (max - min) / (qmax - qmin), range widened to include 0
    pub fn calibrate<'a>(&self, data: impl IntoIterator<Item = &'a f32>) -> QuantParams {
        if let QuantScheme::FixedPoint { frac_width } = self.scheme {
            return QuantParams { scale: (-f32::from(frac_width)).exp2(), zero_point: 0 };
        }

        let (min_val, max_val) = data
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((0.0f32, 0.0f32), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        let mut params = match self.scheme {
            QuantScheme::Symmetric => {
                let max_abs = min_val.abs().max(max_val.abs());
                QuantParams { scale: max_abs / self.qmax as f32, zero_point: 0 }
            }
            _ => {
                let scale = (max_val - min_val) / (self.qmax - self.qmin) as f32;
                QuantParams { scale, zero_point: 0 }
            }
        };

        // Prevent division by zero
        if params.scale < 1e-10 {
            params.scale = 1e-10;
        }
        if self.scheme == QuantScheme::Asymmetric {
            params.zero_point = ((self.qmin as f32 - min_val / params.scale).round() as i32)
                .clamp(self.qmin, self.qmax);
        }
        params
    }

    /// Quantize then dequantize a single value.
    pub fn fake_quantize(&self, x: f32, params: QuantParams) -> f32 {
        let q = ((x / params.scale).round() + params.zero_point as f32)
            .clamp(self.qmin as f32, self.qmax as f32) as i32;
        (q - params.zero_point) as f32 * params.scale
    }

    /// Calibrate and fake-quantize a tensor, returning the values and the
    /// parameters used (one per tensor, or one per output channel).
    pub fn quantize_tensor(
        &self,
        tensor: &Tensor,
        granularity: QuantGranularity,
    ) -> (Tensor, Vec<QuantParams>) {
        let params = match granularity {
            QuantGranularity::PerTensor => vec![self.calibrate(tensor.iter())],
            QuantGranularity::PerChannel if tensor.ndim() > 0 => {
                tensor.axis_iter(Axis(0)).map(|ch| self.calibrate(ch.iter())).collect()
            }
            QuantGranularity::PerChannel => vec![self.calibrate(tensor.iter())],
        };
        let out = self.quantize_with(tensor, &params);
        (out, params)
    }

    /// Fake-quantize with already calibrated parameters.
    ///
    /// A single parameter set applies to the whole tensor; otherwise one per
    /// slice along axis 0.
    pub fn quantize_with(&self, tensor: &Tensor, params: &[QuantParams]) -> Tensor {
        let mut out = tensor.clone();
        match params {
            [single] => out.mapv_inplace(|x| self.fake_quantize(x, *single)),
            many => {
                for (mut ch, p) in out.axis_iter_mut(Axis(0)).zip(many) {
                    ch.mapv_inplace(|x| self.fake_quantize(x, *p));
                }
            }
        }
        out
    }
}
