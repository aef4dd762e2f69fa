//! Retraining through an external trainer.

use crate::graph::{Graph, LayerId};
use crate::mask::effective;
use crate::quant::{quantize, QuantizeConfig, QuantizeOutcome};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration of one `retrain` pass.
///
/// Keys other than the ones below are handed to the trainer untouched
/// through [`RetrainConfig::options`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrainConfig {
    epochs: usize,
    learning_rate: f64,
    batch_size: usize,
    #[serde(flatten)]
    options: BTreeMap<String, serde_yaml::Value>,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self { epochs: 1, learning_rate: 1e-3, batch_size: 32, options: BTreeMap::new() }
    }
}

impl RetrainConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Trainer-specific options.
    pub fn options(&self) -> &BTreeMap<String, serde_yaml::Value> {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.options.get(key)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::invalid_config("epochs", "must be at least 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::invalid_config(
                "learning_rate",
                format!("must be a positive finite number, got {}", self.learning_rate),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::invalid_config("batch_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// What a trainer reports back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub epochs_run: usize,
    /// Loss at the end of each epoch.
    pub losses: Vec<f64>,
}

impl TrainReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.losses.last().copied()
    }
}

/// An external training loop.
///
/// The trainer may update any live weight. Masked positions are restored
/// to zero by the retrain pass afterwards.
pub trait Trainer {
    fn train(&mut self, graph: &mut Graph, config: &RetrainConfig) -> Result<TrainReport>;

    /// Name used in log events.
    fn name(&self) -> &str {
        "trainer"
    }
}

/// Result of a retrain pass.
#[derive(Debug, Clone, Serialize)]
pub struct RetrainOutcome {
    pub report: TrainReport,
    /// Layers whose static mask was re-applied.
    pub remasked: Vec<LayerId>,
    /// Present when a quantized graph was put back on its grid.
    pub requantized: Option<QuantizeOutcome>,
}

/// Fold trained live weights into the stored originals and reset every
/// masked layer's live weight to its effective value.
pub fn reapply_masks(graph: &mut Graph) -> Result<Vec<LayerId>> {
    let ids: Vec<LayerId> = graph.masks().weights().map(|(id, _)| id.clone()).collect();
    for id in &ids {
        let live = graph
            .node(id)?
            .layer()
            .weight()
            .cloned()
            .ok_or_else(|| Error::UnknownLayer { layer: id.to_string() })?;
        let mw = graph
            .masks_mut()
            .weight_mut(id)
            .ok_or_else(|| Error::UnknownLayer { layer: id.to_string() })?;
        mw.fold_live(&live).map_err(|_| Error::MaskShapeMismatch {
            layer: id.to_string(),
            mask: mw.shape().to_vec(),
            weight: live.shape().to_vec(),
        })?;
        let weight = effective(mw);
        graph.node_mut(id)?.layer_mut().set_weight(weight)?;
    }
    Ok(ids)
}

/// Run `trainer` on `graph`, then restore the static masks.
///
/// A quantized graph is re-quantized with `quantization` so its live
/// weights stay on the grid. Without a known quantization config the
/// graph is marked unquantized.
pub fn retrain(
    graph: &mut Graph,
    trainer: &mut dyn Trainer,
    config: &RetrainConfig,
    quantization: Option<&QuantizeConfig>,
) -> Result<RetrainOutcome> {
    config.validate()?;
    let was_quantized = graph.is_quantized();

    tracing::info!(
        trainer = trainer.name(),
        epochs = config.epochs(),
        learning_rate = config.learning_rate(),
        "retraining"
    );
    let report = trainer.train(graph, config)?;
    let remasked = reapply_masks(graph)?;

    let requantized = match (was_quantized, quantization) {
        (true, Some(q)) => Some(quantize(graph, q)?),
        (true, None) => {
            tracing::warn!("retrained weights left the quantization grid; graph marked unquantized");
            graph.set_quantization(Default::default());
            None
        }
        (false, _) => None,
    };

    tracing::info!(
        epochs_run = report.epochs_run,
        final_loss = ?report.final_loss(),
        remasked = remasked.len(),
        "retraining complete"
    );
    Ok(RetrainOutcome { report, remasked, requantized })
}
