//! Pruning configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Scoring criterion used to rank weights or activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PruneMethod {
    /// Rank by absolute value.
    #[default]
    #[serde(alias = "l1-norm")]
    L1Norm,

    /// Rank by squared value.
    #[serde(alias = "l2-norm")]
    L2Norm,

    /// Rank by a seeded uniform draw.
    Random,
}

impl PruneMethod {
    /// Get the display name for this method.
    pub fn display_name(&self) -> &'static str {
        match self {
            PruneMethod::L1Norm => "L1 norm",
            PruneMethod::L2Norm => "L2 norm",
            PruneMethod::Random => "Random",
        }
    }

    /// Whether the resulting mask depends on the seed.
    pub fn is_stochastic(&self) -> bool {
        matches!(self, PruneMethod::Random)
    }
}

/// Unit that is kept or removed as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Any single element can be pruned.
    #[default]
    Element,
    /// Whole output channels are pruned, ranked by mean score.
    Channel,
}

/// Where the ranking is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Each layer reaches the target sparsity on its own.
    #[default]
    Local,
    /// One ranking across all prunable layers.
    Global,
}

fn check_sparsity(field: &str, sparsity: f64) -> Result<()> {
    if !(0.0..1.0).contains(&sparsity) {
        return Err(Error::invalid_config(
            field,
            format!("sparsity must be in [0, 1), got {sparsity}"),
        ));
    }
    Ok(())
}

/// Static weight pruning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightPruneConfig {
    sparsity: f64,
    method: PruneMethod,
    granularity: Granularity,
    scope: Scope,
    seed: u64,
}

impl Default for WeightPruneConfig {
    fn default() -> Self {
        Self {
            sparsity: 0.5,
            method: PruneMethod::default(),
            granularity: Granularity::default(),
            scope: Scope::default(),
            seed: 0,
        }
    }
}

impl WeightPruneConfig {
    pub fn with_sparsity(mut self, sparsity: f64) -> Self {
        self.sparsity = sparsity;
        self
    }

    pub fn with_method(mut self, method: PruneMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn sparsity(&self) -> f64 {
        self.sparsity
    }

    pub fn method(&self) -> PruneMethod {
        self.method
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Dynamic activation pruning settings, applied to the representative batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivationPruneConfig {
    sparsity: f64,
    method: PruneMethod,
    scope: Scope,
    seed: u64,
}

impl Default for ActivationPruneConfig {
    fn default() -> Self {
        Self { sparsity: 0.0, method: PruneMethod::default(), scope: Scope::default(), seed: 0 }
    }
}

impl ActivationPruneConfig {
    pub fn with_sparsity(mut self, sparsity: f64) -> Self {
        self.sparsity = sparsity;
        self
    }

    pub fn with_method(mut self, method: PruneMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn sparsity(&self) -> f64 {
        self.sparsity
    }

    pub fn method(&self) -> PruneMethod {
        self.method
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Configuration of one `prune` pass.
///
/// # Example
///
/// ```
/// use podar::prune::{PruneConfig, PruneMethod, WeightPruneConfig};
///
/// let config = PruneConfig::default()
///     .with_weight(WeightPruneConfig::default().with_sparsity(0.7).with_method(PruneMethod::L2Norm));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PruneConfig {
    weight: WeightPruneConfig,
    activation: ActivationPruneConfig,
}

impl PruneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, weight: WeightPruneConfig) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_activation(mut self, activation: ActivationPruneConfig) -> Self {
        self.activation = activation;
        self
    }

    pub fn weight(&self) -> &WeightPruneConfig {
        &self.weight
    }

    pub fn activation(&self) -> &ActivationPruneConfig {
        &self.activation
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        check_sparsity("weight.sparsity", self.weight.sparsity)?;
        check_sparsity("activation.sparsity", self.activation.sparsity)?;
        Ok(())
    }
}
