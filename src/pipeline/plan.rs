//! Resolution of a pipeline configuration into an ordered plan.
//!
//! A configuration is a YAML document whose pass entries are either an
//! ordered mapping `{pass_name: config}` (optionally under a `passes:` key)
//! or a sequence of such single-entry mappings, which allows a pass to
//! appear more than once. A `null` config selects the pass defaults.

use super::registry::{lookup, PassKind};
use super::trainer::RetrainConfig;
use crate::huffman::HuffmanConfig;
use crate::prune::PruneConfig;
use crate::quant::QuantizeConfig;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Key of the top-level pass list.
pub const PASSES_KEY: &str = "passes";
/// Per-pass key naming a checkpoint directory written after the pass.
pub const SAVE_DIR_KEY: &str = "save_dir";

/// Typed configuration of one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "pass", content = "config", rename_all = "snake_case")]
pub enum PassConfig {
    Prune(PruneConfig),
    Quantize(QuantizeConfig),
    Retrain(RetrainConfig),
    Huffman(HuffmanConfig),
    AddPruningMetadata,
}

fn parse_typed<T: DeserializeOwned + Default>(kind: PassKind, value: &Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value.clone())
        .map_err(|e| Error::invalid_config(kind.name(), e.to_string()))
}

impl PassConfig {
    /// Parse the opaque YAML value of a pass into its typed configuration.
    pub fn parse(kind: PassKind, value: &Value) -> Result<Self> {
        let config = match kind {
            PassKind::Prune => PassConfig::Prune(parse_typed(kind, value)?),
            PassKind::Quantize => PassConfig::Quantize(parse_typed(kind, value)?),
            PassKind::Retrain => PassConfig::Retrain(parse_typed(kind, value)?),
            PassKind::Huffman => PassConfig::Huffman(parse_typed(kind, value)?),
            PassKind::AddPruningMetadata => match value {
                Value::Null => PassConfig::AddPruningMetadata,
                Value::Mapping(m) if m.is_empty() => PassConfig::AddPruningMetadata,
                _ => {
                    return Err(Error::invalid_config(
                        kind.name(),
                        "this pass takes no configuration",
                    ))
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn kind(&self) -> PassKind {
        match self {
            PassConfig::Prune(_) => PassKind::Prune,
            PassConfig::Quantize(_) => PassKind::Quantize,
            PassConfig::Retrain(_) => PassKind::Retrain,
            PassConfig::Huffman(_) => PassKind::Huffman,
            PassConfig::AddPruningMetadata => PassKind::AddPruningMetadata,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            PassConfig::Prune(c) => c.validate(),
            PassConfig::Quantize(c) => c.validate(),
            PassConfig::Retrain(c) => c.validate(),
            PassConfig::Huffman(c) => c.validate(),
            PassConfig::AddPruningMetadata => Ok(()),
        }
    }
}

/// One resolved pass of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassEntry {
    pub kind: PassKind,
    pub config: PassConfig,
    /// Checkpoint directory written after the pass succeeds.
    pub save_dir: Option<PathBuf>,
}

impl PassEntry {
    pub fn new(config: PassConfig) -> Self {
        Self { kind: config.kind(), config, save_dir: None }
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    fn resolve(name: &Value, value: &Value) -> Result<Self> {
        let name = name
            .as_str()
            .ok_or_else(|| Error::invalid_config(PASSES_KEY, format!("pass name must be a string, got {name:?}")))?;
        let kind = lookup(name)?;

        let mut value = value.clone();
        let mut save_dir = None;
        if let Value::Mapping(m) = &mut value {
            if let Some(dir) = m.remove(SAVE_DIR_KEY) {
                let dir = dir.as_str().ok_or_else(|| {
                    Error::invalid_config(format!("{name}.{SAVE_DIR_KEY}"), "must be a path string")
                })?;
                save_dir = Some(PathBuf::from(dir));
            }
            if m.is_empty() {
                value = Value::Null;
            }
        }

        let config = PassConfig::parse(kind, &value)?;
        Ok(Self { kind, config, save_dir })
    }
}

/// Ordered list of passes, fully resolved against the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelinePlan {
    entries: Vec<PassEntry>,
}

impl PipelinePlan {
    pub fn new(entries: Vec<PassEntry>) -> Self {
        Self { entries }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::invalid_config(PASSES_KEY, e.to_string()))?;
        Self::from_value(&value)
    }

    /// Read and parse a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Resolve an ordered mapping of pass names to configurations.
    pub fn from_mapping(mapping: &Mapping) -> Result<Self> {
        Self::from_value(&Value::Mapping(mapping.clone()))
    }

    /// Resolve a parsed YAML document.
    ///
    /// Every entry is resolved before the plan is returned, so an unknown
    /// pass or an invalid config never leaves a partially built plan.
    pub fn from_value(value: &Value) -> Result<Self> {
        let passes = match value {
            Value::Mapping(m) if m.contains_key(PASSES_KEY) => {
                if let Some(extra) = m.keys().find(|k| k.as_str() != Some(PASSES_KEY)) {
                    return Err(Error::invalid_config(
                        PASSES_KEY,
                        format!("unexpected top-level key {extra:?}"),
                    ));
                }
                m.get(PASSES_KEY).unwrap_or(&Value::Null)
            }
            other => other,
        };

        let entries = match passes {
            Value::Null => Vec::new(),
            Value::Mapping(m) => m
                .iter()
                .map(|(name, config)| PassEntry::resolve(name, config))
                .collect::<Result<Vec<_>>>()?,
            Value::Sequence(items) => {
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(_) => entries.push(PassEntry::resolve(item, &Value::Null)?),
                        Value::Mapping(m) if m.len() == 1 => {
                            for (name, config) in m {
                                entries.push(PassEntry::resolve(name, config)?);
                            }
                        }
                        _ => {
                            return Err(Error::invalid_config(
                                PASSES_KEY,
                                "each list item must be a pass name or a single-entry mapping",
                            ))
                        }
                    }
                }
                entries
            }
            _ => {
                return Err(Error::invalid_config(
                    PASSES_KEY,
                    "expected a mapping or a list of passes",
                ))
            }
        };
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PassEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pass names in execution order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.kind.name()).collect()
    }

    /// Append a pass.
    pub fn push(&mut self, entry: PassEntry) {
        self.entries.push(entry);
    }
}
