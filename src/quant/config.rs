//! Quantization pass configuration.

use crate::graph::OpKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Quantization grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantScheme {
    /// Zero point 0, range `[-max_abs, max_abs]`.
    #[default]
    Symmetric,
    /// Zero point chosen so that `[min, max]` (always including 0) covers the grid.
    Asymmetric,
    /// Two's complement fixed point with `frac_width` fractional bits.
    FixedPoint { frac_width: u8 },
}

/// Quantization granularity options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantGranularity {
    /// Single scale/zero-point for entire tensor
    #[default]
    PerTensor,
    /// Separate scale/zero-point per output channel (axis 0)
    PerChannel,
}

/// How `targets` selects layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectBy {
    /// `targets` are op kinds such as `conv2d`.
    #[default]
    Type,
    /// `targets` are layer ids such as `features.0`.
    Name,
}

pub const MIN_BITS: u8 = 2;
pub const MAX_BITS: u8 = 16;

/// Configuration of one `quantize` pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuantizeConfig {
    by: SelectBy,
    targets: Vec<String>,
    #[serde(with = "serde_yaml::with::singleton_map")]
    scheme: QuantScheme,
    bits: u8,
    granularity: QuantGranularity,
    quantize_bias: bool,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            by: SelectBy::Type,
            targets: vec![OpKind::Conv2d.name().to_string()],
            scheme: QuantScheme::default(),
            bits: 8,
            granularity: QuantGranularity::default(),
            quantize_bias: true,
        }
    }
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select layers by op kind.
    pub fn with_types(mut self, ops: &[OpKind]) -> Self {
        self.by = SelectBy::Type;
        self.targets = ops.iter().map(|op| op.name().to_string()).collect();
        self
    }

    /// Select layers by id.
    pub fn with_layers<S: Into<String>>(mut self, layers: impl IntoIterator<Item = S>) -> Self {
        self.by = SelectBy::Name;
        self.targets = layers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scheme(mut self, scheme: QuantScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_bits(mut self, bits: u8) -> Self {
        self.bits = bits;
        self
    }

    pub fn with_granularity(mut self, granularity: QuantGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_quantize_bias(mut self, enabled: bool) -> Self {
        self.quantize_bias = enabled;
        self
    }

    pub fn by(&self) -> SelectBy {
        self.by
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn scheme(&self) -> QuantScheme {
        self.scheme
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn granularity(&self) -> QuantGranularity {
        self.granularity
    }

    pub fn quantize_bias(&self) -> bool {
        self.quantize_bias
    }

    /// Op kinds named by `targets` when selecting by type.
    pub fn target_ops(&self) -> Result<Vec<OpKind>> {
        self.targets
            .iter()
            .map(|t| {
                let op: OpKind = serde_json::from_value(serde_json::Value::String(t.clone()))
                    .map_err(|_| Error::invalid_config("targets", format!("unknown op kind '{t}'")))?;
                if !op.is_prunable() {
                    return Err(Error::invalid_config(
                        "targets",
                        format!("'{t}' layers carry no weights to quantize"),
                    ));
                }
                Ok(op)
            })
            .collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BITS..=MAX_BITS).contains(&self.bits) {
            return Err(Error::invalid_config(
                "bits",
                format!("bit width must be in {MIN_BITS}..={MAX_BITS}, got {}", self.bits),
            ));
        }
        if let QuantScheme::FixedPoint { frac_width } = self.scheme {
            if frac_width >= self.bits {
                return Err(Error::invalid_config(
                    "scheme.frac_width",
                    format!("frac_width {frac_width} must be below the bit width {}", self.bits),
                ));
            }
        }
        if self.targets.is_empty() {
            return Err(Error::invalid_config("targets", "at least one target is required"));
        }
        if self.by == SelectBy::Type {
            self.target_ops()?;
        }
        Ok(())
    }
}
