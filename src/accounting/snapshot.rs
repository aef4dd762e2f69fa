//! Point-in-time accounting and before/after deltas.

use super::flops::{flops, FlopCount};
use super::reduction::Reduction;
use super::storage::{bits_to_bytes, conv_parameter_count, storage_bits, ParameterCount};
use crate::graph::Graph;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Storage, parameter and FLOP accounting of a graph at one moment.
///
/// Always computed fresh from the graph; never cached inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountingSnapshot {
    pub storage_bits: u64,
    pub is_quantized: bool,
    pub conv_parameters: ParameterCount,
    /// `None` when a conv layer has no recorded output shape.
    pub flops: Option<FlopCount>,
}

impl AccountingSnapshot {
    pub fn capture(graph: &Graph) -> Result<Self> {
        let masks = graph.masks();
        let storage_bits = storage_bits(graph, graph.is_quantized(), masks)?;
        let conv_parameters = conv_parameter_count(graph, masks)?;
        let flops = match flops(graph, masks) {
            Ok(count) => Some(count),
            Err(Error::MissingShape { layer }) => {
                tracing::debug!(%layer, "flops unavailable, no output shape recorded");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            storage_bits,
            is_quantized: graph.is_quantized(),
            conv_parameters,
            flops,
        })
    }

    pub fn storage_bytes(&self) -> f64 {
        bits_to_bytes(self.storage_bits)
    }

    /// Compare against a later snapshot.
    pub fn delta(&self, after: &AccountingSnapshot) -> AccountingDelta {
        AccountingDelta { before: *self, after: *after }
    }
}

/// Change in accounting across one pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountingDelta {
    pub before: AccountingSnapshot,
    pub after: AccountingSnapshot,
}

impl AccountingDelta {
    pub fn storage_reduction(&self) -> Reduction {
        Reduction::between(self.before.storage_bits, self.after.storage_bits)
    }

    pub fn parameter_reduction(&self) -> Reduction {
        Reduction::between(
            self.before.conv_parameters.kept as u64,
            self.after.conv_parameters.kept as u64,
        )
    }

    /// Reduction of the post-masking FLOPs relative to the dense count after the pass.
    pub fn flop_reduction(&self) -> Option<Reduction> {
        self.after.flops.map(|f| f.reduction())
    }

    /// Emit the delta as `info` events, and a warning for each undefined ratio.
    pub fn log(&self, pass: &str) {
        let storage = self.storage_reduction();
        let params = self.parameter_reduction();
        tracing::info!(
            pass,
            storage_bytes_before = self.before.storage_bytes(),
            storage_bytes_after = self.after.storage_bytes(),
            storage_reduction = %storage,
            "storage accounting"
        );
        tracing::info!(
            pass,
            conv_params_before = self.before.conv_parameters.kept,
            conv_params_after = self.after.conv_parameters.kept,
            conv_params_total = self.after.conv_parameters.total,
            parameter_reduction = %params,
            "parameter accounting"
        );
        if let Some(f) = self.after.flops {
            tracing::info!(
                pass,
                flops_before = f.before,
                flops_after = f.after,
                flop_reduction = %f.reduction(),
                "flop accounting"
            );
        }
        for (name, r) in [("storage", storage), ("parameter", params)] {
            if !r.is_defined() {
                tracing::warn!(pass, quantity = name, "reduction undefined: zero baseline");
            }
        }
    }
}
