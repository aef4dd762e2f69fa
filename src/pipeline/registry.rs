//! Static pass registry.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of passes the pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Prune,
    Quantize,
    Retrain,
    Huffman,
    AddPruningMetadata,
}

/// Pass names as written in a pipeline configuration.
pub const REGISTRY: &[(&str, PassKind)] = &[
    ("prune", PassKind::Prune),
    ("quantize", PassKind::Quantize),
    ("retrain", PassKind::Retrain),
    ("huffman", PassKind::Huffman),
    ("add_pruning_metadata", PassKind::AddPruningMetadata),
];

impl PassKind {
    pub fn name(&self) -> &'static str {
        match self {
            PassKind::Prune => "prune",
            PassKind::Quantize => "quantize",
            PassKind::Retrain => "retrain",
            PassKind::Huffman => "huffman",
            PassKind::AddPruningMetadata => "add_pruning_metadata",
        }
    }

    /// Whether the pass changes parameters or masks.
    pub fn mutates_parameters(&self) -> bool {
        matches!(self, PassKind::Prune | PassKind::Quantize | PassKind::Retrain)
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comma-separated list of registered pass names.
pub fn known_passes() -> String {
    REGISTRY.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
}

/// Resolve a pass name against the registry.
pub fn lookup(name: &str) -> Result<PassKind> {
    REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| Error::UnknownPass { name: name.to_string(), known: known_passes() })
}
