//! Reference forward executor.
//!
//! Runs calibration batches through the graph's live (effective) weights so
//! the pruning engine can capture activations and the graph can record the
//! shapes the accountant needs. Layout is NCHW.

use super::metadata::{INPUT_SHAPE, OUTPUT_SHAPE};
use super::model::Graph;
use super::node::{Conv2d, Layer, LayerId, Linear};
use crate::tensor::Tensor;
use crate::{Error, Result};
use ndarray::{Array2, Array4, ArrayD, Ix1, Ix2, Ix4, IxDyn};

/// Run `input` through every node and return each node's output, in order.
pub fn forward_trace(graph: &Graph, input: &Tensor) -> Result<Vec<(LayerId, Tensor)>> {
    check_input(graph, input)?;
    let mut outputs = Vec::with_capacity(graph.len());
    let mut current = input.clone();
    for node in graph.nodes() {
        current = apply(node.layer(), &current)
            .map_err(|e| match e {
                Error::ShapeMismatch { context, expected, actual } => Error::ShapeMismatch {
                    context: format!("{} ({context})", node.id()),
                    expected,
                    actual,
                },
                other => other,
            })?;
        outputs.push((node.id().clone(), current.clone()));
    }
    Ok(outputs)
}

/// Run `input` through the graph and return the final output.
pub fn forward(graph: &Graph, input: &Tensor) -> Result<Tensor> {
    Ok(forward_trace(graph, input)?
        .pop()
        .map_or_else(|| input.clone(), |(_, out)| out))
}

/// Record `input_shape` and `output_shape` metadata on every node for `sample`.
pub fn annotate_shapes(graph: &mut Graph, sample: &Tensor) -> Result<()> {
    let trace = forward_trace(graph, sample)?;
    let mut previous = sample.shape().to_vec();
    for (id, output) in trace {
        let meta = graph.metadata_mut(&id)?;
        meta.set_shape(INPUT_SHAPE, &previous);
        meta.set_shape(OUTPUT_SHAPE, output.shape());
        previous = output.shape().to_vec();
    }
    Ok(())
}

/// Check that `input` is a batch of the graph's declared input shape.
pub fn check_input(graph: &Graph, input: &Tensor) -> Result<()> {
    let shape = input.shape();
    if shape.is_empty() || &shape[1..] != graph.input_shape() {
        let mut expected = vec![shape.first().copied().unwrap_or(1)];
        expected.extend_from_slice(graph.input_shape());
        return Err(Error::shape_mismatch("graph input", &expected, shape));
    }
    Ok(())
}

fn apply(layer: &Layer, input: &Tensor) -> Result<Tensor> {
    match layer {
        Layer::Conv2d(conv) => conv2d(conv, input),
        Layer::Linear(fc) => linear(fc, input),
        Layer::Relu => Ok(input.mapv(|x| x.max(0.0))),
        Layer::Flatten => flatten(input),
        Layer::MaxPool2d { kernel } => max_pool2d(*kernel, input),
    }
}

fn as4<'a>(t: &'a Tensor, context: &str) -> Result<ndarray::ArrayView4<'a, f32>> {
    t.view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| Error::shape_mismatch(context, &[0, 0, 0, 0], t.shape()))
}

fn conv2d(conv: &Conv2d, input: &Tensor) -> Result<Tensor> {
    let x = as4(input, "conv2d input [N, C, H, W]")?;
    let w = as4(conv.weight(), "conv2d weight")?;
    let (n, c, h, wd) = x.dim();
    let (c_out, c_in, k, _) = w.dim();
    if c != c_in {
        return Err(Error::shape_mismatch("conv2d input channels", &[c_in], &[c]));
    }
    let (s, p) = (conv.stride(), conv.padding());
    if h + 2 * p < k || wd + 2 * p < k {
        return Err(Error::shape_mismatch("conv2d spatial size vs kernel", &[k, k], &[h + 2 * p, wd + 2 * p]));
    }
    let h_out = (h + 2 * p - k) / s + 1;
    let w_out = (wd + 2 * p - k) / s + 1;

    let bias = conv
        .bias()
        .map(|b| b.view().into_dimensionality::<Ix1>())
        .transpose()
        .map_err(|_| Error::shape_mismatch("conv2d bias", &[c_out], &[]))?;

    let mut out = Array4::<f32>::zeros((n, c_out, h_out, w_out));
    for b in 0..n {
        for co in 0..c_out {
            let base = bias.as_ref().map_or(0.0, |bv| bv[co]);
            for oh in 0..h_out {
                for ow in 0..w_out {
                    let mut acc = base;
                    for ci in 0..c_in {
                        for kh in 0..k {
                            let ih = (oh * s + kh) as isize - p as isize;
                            if ih < 0 || ih >= h as isize {
                                continue;
                            }
                            for kw in 0..k {
                                let iw = (ow * s + kw) as isize - p as isize;
                                if iw < 0 || iw >= wd as isize {
                                    continue;
                                }
                                acc += w[[co, ci, kh, kw]] * x[[b, ci, ih as usize, iw as usize]];
                            }
                        }
                    }
                    out[[b, co, oh, ow]] = acc;
                }
            }
        }
    }
    Ok(out.into_dyn())
}

fn linear(fc: &Linear, input: &Tensor) -> Result<Tensor> {
    let x = input
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::shape_mismatch("linear input [N, in]", &[0, fc.in_features()], input.shape()))?;
    if x.ncols() != fc.in_features() {
        return Err(Error::shape_mismatch("linear input features", &[fc.in_features()], &[x.ncols()]));
    }
    let w = fc
        .weight()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::shape_mismatch("linear weight", &[0, 0], fc.weight().shape()))?;
    let mut out: Array2<f32> = x.dot(&w.t());
    if let Some(b) = fc.bias() {
        let b = b
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| Error::shape_mismatch("linear bias", &[fc.out_features()], b.shape()))?;
        out += &b;
    }
    Ok(out.into_dyn())
}

fn flatten(input: &Tensor) -> Result<Tensor> {
    let n = input.shape().first().copied().unwrap_or(0);
    let rest: usize = input.shape().iter().skip(1).product();
    ArrayD::from_shape_vec(IxDyn(&[n, rest]), input.iter().copied().collect())
        .map_err(|_| Error::shape_mismatch("flatten", &[n, rest], input.shape()))
}

fn max_pool2d(kernel: usize, input: &Tensor) -> Result<Tensor> {
    let x = as4(input, "max_pool2d input [N, C, H, W]")?;
    let (n, c, h, w) = x.dim();
    let k = kernel.max(1);
    let (h_out, w_out) = (h / k, w / k);
    let mut out = Array4::<f32>::from_elem((n, c, h_out, w_out), f32::NEG_INFINITY);
    for b in 0..n {
        for ch in 0..c {
            for oh in 0..h_out {
                for ow in 0..w_out {
                    let mut best = f32::NEG_INFINITY;
                    for kh in 0..k {
                        for kw in 0..k {
                            best = best.max(x[[b, ch, oh * k + kh, ow * k + kw]]);
                        }
                    }
                    out[[b, ch, oh, ow]] = best;
                }
            }
        }
    }
    Ok(out.into_dyn())
}
