//! Shared fixtures for unit tests.

use crate::graph::{annotate_shapes, Conv2d, Graph, GraphBuilder, Layer, Linear};
use crate::prune::CalibrationData;
use crate::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Tensor with uniform values in `[-1, 1)` from a fixed seed.
pub fn seeded_tensor(shape: &[usize], seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    ArrayD::from_shape_fn(IxDyn(shape), |_| rng.random_range(-1.0f32..1.0))
}

/// Tensor holding `0, 1, 2, ...` scaled by `step`.
pub fn ramp(shape: &[usize], step: f32) -> Tensor {
    let n: usize = shape.iter().product();
    ArrayD::from_shape_vec(IxDyn(shape), (0..n).map(|i| (i as f32 + 1.0) * step).collect())
        .expect("ramp shape matches element count")
}

/// One conv layer (`padding = 1`) over an `hw x hw` input, shapes annotated.
pub fn single_conv_graph(c_in: usize, c_out: usize, k: usize, hw: usize, with_bias: bool) -> Graph {
    let weight = seeded_tensor(&[c_out, c_in, k, k], 7);
    let bias = with_bias.then(|| seeded_tensor(&[c_out], 8));
    let conv = Conv2d::new(weight, bias).expect("valid conv").with_padding(k / 2);
    let mut graph = GraphBuilder::new("single-conv", &[c_in, hw, hw])
        .scope("features")
        .layer(Layer::Conv2d(conv))
        .end_scope()
        .build()
        .expect("graph builds");
    annotate_shapes(&mut graph, &ArrayD::zeros(IxDyn(&[1, c_in, hw, hw]))).expect("shapes annotate");
    graph
}

/// Small CNN: two convs, pooling and a classifier head. Input `[1, 6, 6]`.
pub fn tiny_cnn(seed: u64) -> Graph {
    let conv0 = Conv2d::new(seeded_tensor(&[4, 1, 3, 3], seed), Some(seeded_tensor(&[4], seed + 1)))
        .expect("valid conv")
        .with_padding(1);
    let conv1 = Conv2d::new(seeded_tensor(&[4, 4, 3, 3], seed + 2), Some(seeded_tensor(&[4], seed + 3)))
        .expect("valid conv")
        .with_padding(1);
    let fc = Linear::new(seeded_tensor(&[3, 36], seed + 4), Some(seeded_tensor(&[3], seed + 5)))
        .expect("valid linear");
    let mut graph = GraphBuilder::new("tiny-cnn", &[1, 6, 6])
        .scope("features")
        .layer(Layer::Conv2d(conv0))
        .layer(Layer::Relu)
        .layer(Layer::Conv2d(conv1))
        .layer(Layer::Relu)
        .layer(Layer::MaxPool2d { kernel: 2 })
        .end_scope()
        .scope("classifier")
        .layer(Layer::Flatten)
        .layer(Layer::Linear(fc))
        .end_scope()
        .build()
        .expect("graph builds");
    annotate_shapes(&mut graph, &ArrayD::zeros(IxDyn(&[1, 1, 6, 6]))).expect("shapes annotate");
    graph
}

/// Calibration data with `batches` batches of `batch_size` samples for `graph`.
pub fn calibration_for(graph: &Graph, batch_size: usize, batches: usize, seed: u64) -> CalibrationData {
    CalibrationData::synthetic(graph.input_shape(), batch_size, batches, seed)
}
