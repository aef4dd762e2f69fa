//! Mask computation and reversible application.

use super::calibrate::CalibrationData;
use super::config::{Granularity, PruneConfig, Scope};
use super::criterion::{global_masks, local_mask};
use super::metrics::PruningMetrics;
use crate::graph::{check_input, forward_trace, Graph, LayerId};
use crate::mask::{effective, MaskedWeight};
use crate::tensor::{count_kept, Mask, Tensor};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

/// Masks produced by one prune pass, in module traversal order.
#[derive(Debug, Clone, Serialize)]
pub struct PruneOutcome {
    pub weight_masks: Vec<(LayerId, Mask)>,
    pub activation_masks: Vec<(LayerId, Mask)>,
    pub metrics: PruningMetrics,
}

struct Target {
    id: LayerId,
    originals: Tensor,
    live: Tensor,
}

/// Collect prunable layers with their stored originals and live weights.
fn collect_targets(graph: &Graph, metrics: &mut PruningMetrics) -> Result<Vec<Target>> {
    let mut targets = Vec::new();
    for node in graph.prunable_nodes() {
        let Some(live) = node.layer().weight() else {
            continue;
        };
        if live.is_empty() {
            tracing::debug!(layer = %node.id(), "skipping layer without parameters");
            metrics.skipped_layers.push(node.id().to_string());
            continue;
        }
        let originals = match graph.masks().weight(node.id()) {
            Some(mw) if mw.shape() != live.shape() => {
                return Err(Error::MaskShapeMismatch {
                    layer: node.id().to_string(),
                    mask: mw.shape().to_vec(),
                    weight: live.shape().to_vec(),
                });
            }
            Some(mw) => mw.values().clone(),
            None => live.clone(),
        };
        targets.push(Target { id: node.id().clone(), originals, live: live.clone() });
    }
    Ok(targets)
}

/// Prune every conv and linear layer of `graph`.
///
/// Weight masks rank the live (effective) weights. They are applied
/// reversibly: the mask store keeps the original values and the live weight
/// becomes `values ⊙ mask`. Activation masks are then captured by running
/// the first calibration batch through the masked graph.
pub fn prune(
    graph: &mut Graph,
    calibration: &CalibrationData,
    config: &PruneConfig,
) -> Result<PruneOutcome> {
    config.validate()?;
    let batch = calibration.first_batch().ok_or(Error::MissingCalibration)?;
    check_input(graph, batch)?;

    let weight_cfg = config.weight();
    let mut metrics = PruningMetrics::new(weight_cfg.sparsity());
    metrics.activation_target = config.activation().sparsity();

    let targets = collect_targets(graph, &mut metrics)?;
    if weight_cfg.method().is_stochastic() {
        tracing::debug!(seed = weight_cfg.seed(), "weight scores drawn at random");
    }
    let masks = {
        let mut rng = StdRng::seed_from_u64(weight_cfg.seed());
        let ranked: Vec<&Tensor> = targets.iter().map(|t| &t.live).collect();
        match weight_cfg.scope() {
            Scope::Local => ranked
                .iter()
                .map(|t| {
                    local_mask(
                        t,
                        weight_cfg.sparsity(),
                        weight_cfg.method(),
                        weight_cfg.granularity(),
                        &mut rng,
                    )
                })
                .collect::<Vec<_>>(),
            Scope::Global => global_masks(
                &ranked,
                weight_cfg.sparsity(),
                weight_cfg.method(),
                weight_cfg.granularity(),
                &mut rng,
            ),
        }
    };

    let mut weight_masks = Vec::with_capacity(targets.len());
    let (mut pruned, mut total) = (0usize, 0usize);
    for (target, mask) in targets.into_iter().zip(masks) {
        let mw = MaskedWeight::new(target.originals, mask.clone())?;
        graph.node_mut(&target.id)?.layer_mut().set_weight(effective(&mw))?;

        tracing::debug!(
            layer = %target.id,
            kept = mw.kept(),
            total = mw.total(),
            sparsity = mw.sparsity(),
            "weight mask applied"
        );
        metrics.add_layer_sparsity(target.id.as_str(), mw.sparsity());
        pruned += mw.total() - mw.kept();
        total += mw.total();

        graph.masks_mut().insert_weight(target.id.clone(), mw);
        weight_masks.push((target.id, mask));
    }
    metrics.update_sparsity(pruned, total);

    let activation_masks = capture_activation_masks(graph, batch, config, &weight_masks)?;
    let (act_total, act_kept) = activation_masks
        .iter()
        .fold((0, 0), |(t, k), (_, m)| (t + m.len(), k + count_kept(m)));
    if act_total > 0 {
        metrics.activation_sparsity = Some((act_total - act_kept) as f64 / act_total as f64);
    }
    graph.masks().check_counts()?;

    tracing::info!(
        layers = weight_masks.len(),
        method = weight_cfg.method().display_name(),
        target = metrics.target_sparsity,
        achieved = metrics.achieved_sparsity,
        activation = ?metrics.activation_sparsity,
        "pruning complete"
    );

    Ok(PruneOutcome { weight_masks, activation_masks, metrics })
}

/// One activation mask per weight-masked layer, from the representative batch.
fn capture_activation_masks(
    graph: &mut Graph,
    batch: &Tensor,
    config: &PruneConfig,
    weight_masks: &[(LayerId, Mask)],
) -> Result<Vec<(LayerId, Mask)>> {
    let trace = forward_trace(graph, batch)?;
    let outputs: Vec<(&LayerId, &Tensor)> = weight_masks
        .iter()
        .filter_map(|(id, _)| trace.iter().find(|(t, _)| t == id).map(|(_, a)| (id, a)))
        .collect();
    if outputs.len() != weight_masks.len() {
        return Err(Error::MaskCountMismatch {
            weight_masks: weight_masks.len(),
            activation_masks: outputs.len(),
        });
    }

    let act_cfg = config.activation();
    let mut rng = StdRng::seed_from_u64(act_cfg.seed());
    let masks = match act_cfg.scope() {
        Scope::Local => outputs
            .iter()
            .map(|(_, a)| {
                local_mask(a, act_cfg.sparsity(), act_cfg.method(), Granularity::Element, &mut rng)
            })
            .collect::<Vec<_>>(),
        Scope::Global => {
            let acts: Vec<&Tensor> = outputs.iter().map(|(_, a)| *a).collect();
            global_masks(&acts, act_cfg.sparsity(), act_cfg.method(), Granularity::Element, &mut rng)
        }
    };

    let mut activation_masks = Vec::with_capacity(masks.len());
    for ((id, _), mask) in outputs.into_iter().zip(masks) {
        tracing::debug!(layer = %id, shape = ?mask.shape(), kept = count_kept(&mask), "activation mask captured");
        graph.masks_mut().insert_activation(id.clone(), mask.clone());
        activation_masks.push((id.clone(), mask));
    }
    Ok(activation_masks)
}
