//! Pass pipeline orchestration
//!
//! A static registry maps pass names to [`PassKind`]s. A YAML configuration
//! is resolved into a [`PipelinePlan`] of typed [`PassConfig`]s before any
//! pass runs; the [`Pipeline`] then threads one [`PipelineContext`] through
//! the passes in order and records accounting before and after each.
//!
//! # Example
//!
//! ```ignore
//! use podar::pipeline::{Pipeline, PipelineContext, PipelinePlan};
//!
//! let plan = PipelinePlan::from_yaml_str("passes:\n  prune:\n  quantize:\n    bits: 8\n")?;
//! let mut ctx = PipelineContext::new(graph, calibration);
//! let report = Pipeline::new().run(&mut ctx, &plan)?;
//! ```

mod context;
mod orchestrator;
mod output;
mod plan;
mod registry;
mod stage;
mod trainer;


pub use context::PipelineContext;
pub use orchestrator::Pipeline;
pub use output::{PassOutput, PassRecord, PipelineReport};
pub use plan::{PassConfig, PassEntry, PipelinePlan, PASSES_KEY, SAVE_DIR_KEY};
pub use registry::{known_passes, lookup, PassKind, REGISTRY};
pub use stage::PipelineStage;
pub use trainer::{reapply_masks, retrain, RetrainConfig, RetrainOutcome, TrainReport, Trainer};
