//! Calibration batches driving activation pruning.

use crate::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ordered input batches; the first is the representative batch.
#[derive(Debug, Clone, Default)]
pub struct CalibrationData {
    batches: Vec<Tensor>,
}

impl CalibrationData {
    pub fn new(batches: Vec<Tensor>) -> Self {
        Self { batches }
    }

    /// Seeded uniform `[-1, 1)` batches of shape `[batch_size] + input_shape`.
    pub fn synthetic(input_shape: &[usize], batch_size: usize, batches: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut shape = Vec::with_capacity(input_shape.len() + 1);
        shape.push(batch_size);
        shape.extend_from_slice(input_shape);
        let batches = (0..batches)
            .map(|_| ArrayD::from_shape_fn(IxDyn(&shape), |_| rng.random_range(-1.0f32..1.0)))
            .collect();
        Self { batches }
    }

    /// The representative batch used for activation masks.
    pub fn first_batch(&self) -> Option<&Tensor> {
        self.batches.first()
    }

    pub fn batches(&self) -> &[Tensor] {
        &self.batches
    }

    pub fn push(&mut self, batch: Tensor) {
        self.batches.push(batch);
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Samples in all batches.
    pub fn num_samples(&self) -> usize {
        self.batches.iter().map(|b| b.shape().first().copied().unwrap_or(0)).sum()
    }
}
