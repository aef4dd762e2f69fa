//! Per-node metadata records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key recorded by shape annotation: input shape of the node for the sample batch.
pub const INPUT_SHAPE: &str = "input_shape";
/// Key recorded by shape annotation: output shape of the node for the sample batch.
pub const OUTPUT_SHAPE: &str = "output_shape";

/// Arbitrary key/value record attached to a node.
///
/// Passes write their per-layer findings here (sparsity, quantization
/// parameters, code lengths) so a saved graph carries them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeMetadata {
    entries: BTreeMap<String, Value>,
}

impl NodeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Read a value as f64.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Record a shape under `key`.
    pub fn set_shape(&mut self, key: &str, shape: &[usize]) {
        self.insert(key, Value::from(shape.to_vec()));
    }

    /// Read a shape recorded with [`NodeMetadata::set_shape`].
    pub fn shape(&self, key: &str) -> Option<Vec<usize>> {
        self.get(key)?
            .as_array()?
            .iter()
            .map(|v| v.as_u64().map(|d| d as usize))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
