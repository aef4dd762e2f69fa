//! Relative reductions that stay defined on degenerate baselines.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative reduction `1 - after / before`.
///
/// A zero baseline gives [`Reduction::Undefined`] instead of a division by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Reduction {
    Ratio(f64),
    Undefined,
}

impl Reduction {
    pub fn from_counts(before: f64, after: f64) -> Self {
        if before == 0.0 {
            Reduction::Undefined
        } else {
            Reduction::Ratio(1.0 - after / before)
        }
    }

    /// Reduction between two integer counts.
    pub fn between(before: u64, after: u64) -> Self {
        Self::from_counts(before as f64, after as f64)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Reduction::Ratio(r) => Some(*r),
            Reduction::Undefined => None,
        }
    }

    /// The ratio, or [`Error::NumericDegenerate`] naming `quantity`.
    pub fn try_value(&self, quantity: &str) -> Result<f64> {
        self.value().ok_or_else(|| Error::NumericDegenerate { quantity: quantity.to_string() })
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Reduction::Ratio(_))
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Ratio(r) => write!(f, "{:.2}%", r * 100.0),
            Reduction::Undefined => write!(f, "undefined"),
        }
    }
}
