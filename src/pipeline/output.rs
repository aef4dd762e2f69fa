//! Per-pass outputs and the run report.

use super::registry::PassKind;
use super::trainer::RetrainOutcome;
use crate::accounting::{AccountingDelta, AccountingSnapshot};
use crate::huffman::HuffmanOutcome;
use crate::mask::SparsityReport;
use crate::prune::PruneOutcome;
use crate::quant::QuantizeOutcome;
use crate::Result;
use serde::Serialize;
use std::path::PathBuf;

/// What a pass produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "output", rename_all = "snake_case")]
pub enum PassOutput {
    /// Masks from pruning with the sparsity report recorded right after.
    Prune {
        outcome: PruneOutcome,
        sparsity: SparsityReport,
    },
    Quantize(QuantizeOutcome),
    Retrain(RetrainOutcome),
    Huffman(HuffmanOutcome),
    PruningMetadata(SparsityReport),
}

impl PassOutput {
    /// Sparsity report carried by this output, if any.
    pub fn sparsity(&self) -> Option<&SparsityReport> {
        match self {
            PassOutput::Prune { sparsity, .. } | PassOutput::PruningMetadata(sparsity) => Some(sparsity),
            _ => None,
        }
    }
}

/// One executed pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassRecord {
    pub index: usize,
    pub pass: PassKind,
    pub before: AccountingSnapshot,
    pub after: AccountingSnapshot,
    pub output: PassOutput,
    /// Directory the graph was saved to after the pass.
    pub checkpoint: Option<PathBuf>,
}

impl PassRecord {
    pub fn delta(&self) -> AccountingDelta {
        self.before.delta(&self.after)
    }
}

/// Records of every pass of a run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub records: Vec<PassRecord>,
}

impl PipelineReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record of the first pass of the given kind.
    pub fn find(&self, pass: PassKind) -> Option<&PassRecord> {
        self.records.iter().find(|r| r.pass == pass)
    }

    /// Accounting change from before the first pass to after the last.
    pub fn total_delta(&self) -> Option<AccountingDelta> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some(first.before.delta(&last.after))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
