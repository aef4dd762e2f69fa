//! State threaded through every pass.

use crate::accounting::AccountingSnapshot;
use crate::graph::Graph;
use crate::prune::CalibrationData;
use crate::quant::QuantizeConfig;
use crate::Result;

/// The graph a pipeline mutates, with the data its passes share.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub(super) graph: Graph,
    pub(super) calibration: CalibrationData,
    pub(super) accounting: Option<AccountingSnapshot>,
    pub(super) last_quantization: Option<QuantizeConfig>,
}

impl PipelineContext {
    pub fn new(graph: Graph, calibration: CalibrationData) -> Self {
        Self { graph, calibration, accounting: None, last_quantization: None }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: CalibrationData) {
        self.calibration = calibration;
    }

    /// Accounting captured after the most recent pass.
    pub fn accounting(&self) -> Option<&AccountingSnapshot> {
        self.accounting.as_ref()
    }

    /// Capture accounting from the current graph and keep it.
    pub fn refresh_accounting(&mut self) -> Result<AccountingSnapshot> {
        let snapshot = AccountingSnapshot::capture(&self.graph)?;
        self.accounting = Some(snapshot);
        Ok(snapshot)
    }

    /// Configuration of the last quantize pass that ran on this context.
    pub fn last_quantization(&self) -> Option<&QuantizeConfig> {
        self.last_quantization.as_ref()
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}
