//! Pipeline stage enum

use serde::{Deserialize, Serialize};

/// Current stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PipelineStage {
    /// Not started.
    #[default]
    Idle,
    /// Resolving the plan and checking collaborators.
    Resolving,
    /// Running a pass.
    Running,
    /// Writing a checkpoint after a pass.
    Checkpointing,
    /// Every pass finished.
    Complete,
    /// A pass or the plan failed.
    Failed,
}

impl PipelineStage {
    /// Check if the pipeline is in an active (non-terminal) state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PipelineStage::Resolving | PipelineStage::Running | PipelineStage::Checkpointing
        )
    }

    /// Check if the pipeline is complete (success or failure).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Complete | PipelineStage::Failed)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "Idle",
            PipelineStage::Resolving => "Resolving",
            PipelineStage::Running => "Running",
            PipelineStage::Checkpointing => "Checkpointing",
            PipelineStage::Complete => "Complete",
            PipelineStage::Failed => "Failed",
        }
    }
}
