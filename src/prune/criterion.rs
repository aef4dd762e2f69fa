//! Importance scores and top-k mask selection.

use super::config::{Granularity, PruneMethod};
use crate::tensor::{Mask, Tensor};
use ndarray::{ArrayD, Dimension, IxDyn};
use rand::rngs::StdRng;
use rand::Rng;

/// Number of units removed for a target sparsity: `floor(n * sparsity)`.
pub fn prune_count(n: usize, sparsity: f64) -> usize {
    ((n as f64) * sparsity).floor() as usize
}

/// Per-element importance; lower scores are pruned first.
pub fn element_scores(tensor: &Tensor, method: PruneMethod, rng: &mut StdRng) -> Vec<f64> {
    match method {
        PruneMethod::L1Norm => tensor.iter().map(|&v| f64::from(v.abs())).collect(),
        PruneMethod::L2Norm => tensor.iter().map(|&v| f64::from(v) * f64::from(v)).collect(),
        PruneMethod::Random => tensor.iter().map(|_| rng.random::<f64>()).collect(),
    }
}

/// Scores of the pruning units of a weight: elements, or output channels
/// (mean element score over axis 0).
pub fn unit_scores(
    tensor: &Tensor,
    method: PruneMethod,
    granularity: Granularity,
    rng: &mut StdRng,
) -> Vec<f64> {
    let scores = element_scores(tensor, method, rng);
    match granularity {
        Granularity::Element => scores,
        Granularity::Channel => {
            let channels = tensor.shape().first().copied().unwrap_or(0);
            if channels == 0 {
                return Vec::new();
            }
            let per_channel = scores.len() / channels;
            scores
                .chunks(per_channel.max(1))
                .map(|c| c.iter().sum::<f64>() / c.len() as f64)
                .collect()
        }
    }
}

/// Keep-flags with the `count` lowest scores set to `false`.
///
/// Ties are broken by index so that the result is reproducible.
pub fn keep_flags(scores: &[f64], count: usize) -> Vec<bool> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]).then(a.cmp(&b)));
    let mut keep = vec![true; scores.len()];
    for &i in order.iter().take(count) {
        keep[i] = false;
    }
    keep
}

/// Expand unit keep-flags to an element mask of `shape`.
pub fn expand_units(flags: &[bool], shape: &[usize], granularity: Granularity) -> Mask {
    match granularity {
        Granularity::Element => ArrayD::from_shape_fn(IxDyn(shape), |idx| {
            let flat = flat_index(idx.slice(), shape);
            flags[flat]
        }),
        Granularity::Channel => ArrayD::from_shape_fn(IxDyn(shape), |idx| flags[idx[0]]),
    }
}

fn flat_index(idx: &[usize], shape: &[usize]) -> usize {
    idx.iter().zip(shape).fold(0, |acc, (&i, &d)| acc * d + i)
}

/// Mask of `tensor` removing `floor(n * sparsity)` lowest-scoring units.
pub fn local_mask(
    tensor: &Tensor,
    sparsity: f64,
    method: PruneMethod,
    granularity: Granularity,
    rng: &mut StdRng,
) -> Mask {
    let scores = unit_scores(tensor, method, granularity, rng);
    let flags = keep_flags(&scores, prune_count(scores.len(), sparsity));
    expand_units(&flags, tensor.shape(), granularity)
}

/// Masks for several tensors ranked together: `floor(N * sparsity)` of all units go.
pub fn global_masks(
    tensors: &[&Tensor],
    sparsity: f64,
    method: PruneMethod,
    granularity: Granularity,
    rng: &mut StdRng,
) -> Vec<Mask> {
    let per_tensor: Vec<Vec<f64>> = tensors
        .iter()
        .map(|t| unit_scores(t, method, granularity, rng))
        .collect();
    let all: Vec<f64> = per_tensor.iter().flatten().copied().collect();
    let flags = keep_flags(&all, prune_count(all.len(), sparsity));

    let mut offset = 0;
    tensors
        .iter()
        .zip(&per_tensor)
        .map(|(t, scores)| {
            let slice = &flags[offset..offset + scores.len()];
            offset += scores.len();
            expand_units(slice, t.shape(), granularity)
        })
        .collect()
}
