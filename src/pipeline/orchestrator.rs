//! Pass pipeline orchestrator
//!
//! Runs a resolved plan pass by pass against one context.

use super::context::PipelineContext;
use super::output::{PassOutput, PassRecord, PipelineReport};
use super::plan::{PassConfig, PassEntry, PipelinePlan};
use super::registry::PassKind;
use super::stage::PipelineStage;
use super::trainer::{retrain, Trainer};
use crate::accounting::AccountingSnapshot;
use crate::checkpoint;
use crate::huffman::huffman_encode;
use crate::prune::{add_pruning_metadata, prune};
use crate::quant::quantize;
use crate::{Error, Result};
use serde_yaml::Mapping;
use std::fmt;

/// Pass pipeline orchestrator.
///
/// Holds the collaborators passes may need and tracks the stage of the
/// current run.
#[derive(Default)]
pub struct Pipeline {
    trainer: Option<Box<dyn Trainer>>,
    stage: PipelineStage,
    /// Index of the pass currently or last running.
    current: Option<usize>,
    completed: usize,
    total: usize,
    /// Error message if failed.
    error: Option<String>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("trainer", &self.trainer.as_ref().map(|t| t.name().to_string()))
            .field("stage", &self.stage)
            .field("current", &self.current)
            .field("completed", &self.completed)
            .field("total", &self.total)
            .field("error", &self.error)
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the trainer used by `retrain` passes.
    pub fn with_trainer(mut self, trainer: impl Trainer + 'static) -> Self {
        self.trainer = Some(Box::new(trainer));
        self
    }

    pub fn has_trainer(&self) -> bool {
        self.trainer.is_some()
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Get the error message if failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Index of the pass currently or last running.
    pub fn current_pass(&self) -> Option<usize> {
        self.current
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.stage.is_active()
    }

    pub fn succeeded(&self) -> bool {
        self.stage == PipelineStage::Complete
    }

    pub fn failed(&self) -> bool {
        self.stage == PipelineStage::Failed
    }

    /// Fraction of passes finished in the current run (0.0 to 1.0).
    pub fn overall_progress(&self) -> f32 {
        match self.stage {
            PipelineStage::Idle | PipelineStage::Resolving => 0.0,
            PipelineStage::Complete => 1.0,
            _ if self.total == 0 => 0.0,
            _ => self.completed as f32 / self.total as f32,
        }
    }

    /// Reset the pipeline to idle state.
    pub fn reset(&mut self) {
        self.stage = PipelineStage::Idle;
        self.current = None;
        self.completed = 0;
        self.total = 0;
        self.error = None;
    }

    fn advance(&mut self, stage: PipelineStage) {
        tracing::debug!(from = self.stage.display_name(), to = stage.display_name(), "pipeline stage");
        self.stage = stage;
    }

    fn fail(&mut self, error: Error) -> Error {
        tracing::error!(
            stage = self.stage.display_name(),
            pass = ?error.pass_name(),
            error = %error,
            "pipeline failed"
        );
        self.error = Some(error.to_string());
        self.advance(PipelineStage::Failed);
        error
    }

    /// Resolve `mapping` into a plan and run it.
    ///
    /// Resolution fails before any pass runs, leaving the graph untouched.
    pub fn run_config(&mut self, ctx: &mut PipelineContext, mapping: &Mapping) -> Result<PipelineReport> {
        self.reset();
        self.advance(PipelineStage::Resolving);
        let plan = PipelinePlan::from_mapping(mapping).map_err(|e| self.fail(e))?;
        self.run(ctx, &plan)
    }

    /// Run every pass of `plan` in order.
    ///
    /// Collaborators and configs are checked for all passes before the
    /// first one runs. A pass failure is wrapped in [`Error::Pass`]; the
    /// passes before it keep their mutations.
    pub fn run(&mut self, ctx: &mut PipelineContext, plan: &PipelinePlan) -> Result<PipelineReport> {
        self.reset();
        self.advance(PipelineStage::Resolving);
        self.total = plan.len();
        self.check_plan(plan).map_err(|e| self.fail(e))?;

        tracing::info!(passes = ?plan.pass_names(), "pipeline started");
        self.advance(PipelineStage::Running);
        let mut report = PipelineReport::default();
        for (index, entry) in plan.entries().iter().enumerate() {
            self.current = Some(index);
            let record = self
                .run_pass(ctx, index, entry)
                .map_err(|e| self.fail(e.in_pass(entry.kind.name(), index)))?;
            report.records.push(record);
            self.completed += 1;
        }

        self.advance(PipelineStage::Complete);
        tracing::info!(passes = report.len(), "pipeline complete");
        if let Some(delta) = report.total_delta() {
            delta.log("pipeline");
        }
        Ok(report)
    }

    fn check_plan(&self, plan: &PipelinePlan) -> Result<()> {
        for (index, entry) in plan.entries().iter().enumerate() {
            let name = entry.kind.name();
            entry.config.validate().map_err(|e| e.in_pass(name, index))?;
            if entry.kind == PassKind::Retrain && self.trainer.is_none() {
                return Err(missing_trainer().in_pass(name, index));
            }
        }
        Ok(())
    }

    fn run_pass(&mut self, ctx: &mut PipelineContext, index: usize, entry: &PassEntry) -> Result<PassRecord> {
        let name = entry.kind.name();
        tracing::info!(pass = name, index, "pass started");
        let before = AccountingSnapshot::capture(&ctx.graph)?;

        let output = match &entry.config {
            PassConfig::Prune(config) => {
                let outcome = prune(&mut ctx.graph, &ctx.calibration, config)?;
                let sparsity = add_pruning_metadata(&mut ctx.graph)?;
                PassOutput::Prune { outcome, sparsity }
            }
            PassConfig::Quantize(config) => {
                let outcome = quantize(&mut ctx.graph, config)?;
                ctx.last_quantization = Some(config.clone());
                PassOutput::Quantize(outcome)
            }
            PassConfig::Retrain(config) => {
                let trainer = self.trainer.as_deref_mut().ok_or_else(missing_trainer)?;
                let outcome = retrain(&mut ctx.graph, trainer, config, ctx.last_quantization.as_ref())?;
                PassOutput::Retrain(outcome)
            }
            PassConfig::Huffman(config) => PassOutput::Huffman(huffman_encode(&ctx.graph, config)?),
            PassConfig::AddPruningMetadata => PassOutput::PruningMetadata(add_pruning_metadata(&mut ctx.graph)?),
        };

        let after = ctx.refresh_accounting()?;
        if entry.kind.mutates_parameters() {
            before.delta(&after).log(name);
        }

        let checkpoint = match &entry.save_dir {
            Some(dir) => {
                self.advance(PipelineStage::Checkpointing);
                checkpoint::save(&ctx.graph, dir)?;
                tracing::info!(pass = name, dir = %dir.display(), "checkpoint saved");
                self.advance(PipelineStage::Running);
                Some(dir.clone())
            }
            None => None,
        };

        tracing::info!(pass = name, index, "pass finished");
        Ok(PassRecord { index, pass: entry.kind, before, after, output, checkpoint })
    }
}

fn missing_trainer() -> Error {
    Error::MissingCollaborator { pass: PassKind::Retrain.name().to_string(), collaborator: "trainer".to_string() }
}
