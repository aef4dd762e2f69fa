//! Weight and activation pruning
//!
//! Produces static weight masks and dynamic activation masks for every
//! convolutional and linear layer, and applies the weight masks reversibly
//! through the mask store:
//!
//! - **Criteria**: L1 norm, L2 norm or seeded random scores
//! - **Granularity**: single elements or whole output channels
//! - **Scope**: per-layer or one global ranking
//!
//! # Example
//!
//! ```ignore
//! use podar::prune::{prune, CalibrationData, PruneConfig};
//!
//! let calibration = CalibrationData::synthetic(graph.input_shape(), 8, 1, 0);
//! let outcome = prune(&mut graph, &calibration, &PruneConfig::default())?;
//! println!("achieved {:.2}", outcome.metrics.achieved_sparsity);
//! ```

mod calibrate;
mod config;
mod criterion;
mod engine;
mod metadata;
mod metrics;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod tests;

pub use calibrate::CalibrationData;
pub use config::{
    ActivationPruneConfig, Granularity, PruneConfig, PruneMethod, Scope, WeightPruneConfig,
};
pub use criterion::prune_count;
pub use engine::{prune, PruneOutcome};
pub use metadata::{add_pruning_metadata, ACTIVATION_SPARSITY, WEIGHT_KEPT, WEIGHT_SPARSITY};
pub use metrics::PruningMetrics;
