//! Tests for the pruning engine.

use super::criterion::{keep_flags, local_mask};
use super::*;
use crate::graph::{GraphBuilder, Layer, LayerId, Linear};
use crate::mask::effective;
use crate::tensor::{count_kept, tensor_from_vec};
use crate::test_support::{calibration_for, ramp, seeded_tensor, single_conv_graph, tiny_cnn};
use crate::{Error, ErrorClass};
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn weight_only(sparsity: f64) -> PruneConfig {
    PruneConfig::default().with_weight(WeightPruneConfig::default().with_sparsity(sparsity))
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_defaults() {
    // TEST_ID: PRN-001
    let config = PruneConfig::default();
    assert_eq!(config.weight().method(), PruneMethod::L1Norm);
    assert_eq!(config.weight().granularity(), Granularity::Element);
    assert_eq!(config.weight().scope(), Scope::Local);
    assert_relative_eq!(config.weight().sparsity(), 0.5);
    assert_relative_eq!(config.activation().sparsity(), 0.0);
}

#[test]
fn test_config_rejects_out_of_range_sparsity() {
    // TEST_ID: PRN-002
    for bad in [1.0, 1.5, -0.1, f64::NAN] {
        let err = weight_only(bad).validate().unwrap_err();
        assert_eq!(err.class(), ErrorClass::Configuration, "PRN-002 FALSIFIED: sparsity {bad}");
    }
    let err = PruneConfig::default()
        .with_activation(ActivationPruneConfig::default().with_sparsity(1.0))
        .validate()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { ref field, .. } if field == "activation.sparsity"));
}

#[test]
fn test_config_from_yaml() {
    let yaml = "weight:\n  sparsity: 0.3\n  method: l2_norm\n  granularity: channel\n  scope: global\nactivation:\n  sparsity: 0.2\n  method: l1-norm\n";
    let config: PruneConfig = serde_yaml::from_str(yaml).unwrap();
    assert_relative_eq!(config.weight().sparsity(), 0.3);
    assert_eq!(config.weight().method(), PruneMethod::L2Norm);
    assert_eq!(config.weight().granularity(), Granularity::Channel);
    assert_eq!(config.weight().scope(), Scope::Global);
    assert_eq!(config.activation().method(), PruneMethod::L1Norm);
}

#[test]
fn test_config_rejects_unknown_fields() {
    let yaml = "weight:\n  sparsity: 0.3\n  schedule: cubic\n";
    assert!(serde_yaml::from_str::<PruneConfig>(yaml).is_err());
}

// =============================================================================
// Criterion
// =============================================================================

#[test]
fn test_keep_flags_breaks_ties_by_index() {
    let flags = keep_flags(&[1.0, 0.0, 0.0, 0.0, 2.0], 2);
    assert_eq!(flags, vec![true, false, false, true, true]);
}

#[test]
fn test_local_mask_removes_lowest_magnitudes() {
    let t = tensor_from_vec(&[2, 3], vec![0.5, -3.0, 0.1, 2.0, -0.2, 1.0]).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let mask = local_mask(&t, 0.5, PruneMethod::L1Norm, Granularity::Element, &mut rng);
    assert_eq!(
        mask.iter().copied().collect::<Vec<_>>(),
        vec![false, true, false, true, false, true]
    );
}

#[test]
fn test_channel_granularity_masks_whole_channels() {
    // Channel 1 has the smallest mean magnitude.
    let t = tensor_from_vec(&[3, 2], vec![1.0, 1.0, 0.1, 0.1, 2.0, -2.0]).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let mask = local_mask(&t, 0.5, PruneMethod::L1Norm, Granularity::Channel, &mut rng);
    assert_eq!(
        mask.iter().copied().collect::<Vec<_>>(),
        vec![true, true, false, false, true, true]
    );
}

// =============================================================================
// Engine
// =============================================================================

#[test]
fn test_prune_exact_layer_sparsity() {
    // TEST_ID: PRN-010
    let mut graph = tiny_cnn(11);
    let calibration = calibration_for(&graph, 2, 1, 3);
    let outcome = prune(&mut graph, &calibration, &weight_only(0.5)).unwrap();

    let ids: Vec<&str> = outcome.weight_masks.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["features.0", "features.2", "classifier.1"]);
    for (id, mask) in &outcome.weight_masks {
        let n = mask.len();
        assert_eq!(
            n - count_kept(mask),
            prune_count(n, 0.5),
            "PRN-010 FALSIFIED: {id} must lose exactly floor(n*s) weights"
        );
    }
    assert_relative_eq!(outcome.metrics.achieved_sparsity, 0.5);
    assert_eq!(outcome.metrics.total_parameters, 36 + 144 + 108);
}

#[test]
fn test_prune_is_reversible() {
    // TEST_ID: PRN-011
    let mut graph = single_conv_graph(1, 2, 3, 4, true);
    let original = graph.node(&LayerId::new("features.0")).unwrap().layer().weight().unwrap().clone();
    let calibration = calibration_for(&graph, 1, 1, 0);
    prune(&mut graph, &calibration, &weight_only(0.5)).unwrap();

    let id = LayerId::new("features.0");
    let mw = graph.masks().weight(&id).unwrap();
    assert_eq!(mw.values(), &original, "PRN-011 FALSIFIED: originals must be retained");
    let live = graph.node(&id).unwrap().layer().weight().unwrap();
    assert_eq!(live, &effective(mw), "PRN-011 FALSIFIED: live weight must equal effective");
    assert_eq!(live.iter().filter(|&&v| v == 0.0).count(), 9);
}

#[test]
fn test_prune_masks_smallest_ramp_values() {
    let mut graph = single_conv_graph(1, 1, 3, 4, false);
    let id = LayerId::new("features.0");
    graph.node_mut(&id).unwrap().layer_mut().set_weight(ramp(&[1, 1, 3, 3], 0.1)).unwrap();
    let calibration = calibration_for(&graph, 1, 1, 0);
    prune(&mut graph, &calibration, &weight_only(0.4)).unwrap();

    let mask = graph.masks().weight(&id).unwrap().mask();
    // floor(9 * 0.4) = 3 smallest go.
    assert_eq!(
        mask.iter().copied().collect::<Vec<_>>(),
        vec![false, false, false, true, true, true, true, true, true]
    );
}

#[test]
fn test_prune_without_calibration_leaves_graph_untouched() {
    // TEST_ID: PRN-012
    let mut graph = tiny_cnn(2);
    let before = graph.node(&LayerId::new("features.0")).unwrap().layer().weight().unwrap().clone();
    let err = prune(&mut graph, &CalibrationData::default(), &weight_only(0.5)).unwrap_err();
    assert!(matches!(err, Error::MissingCalibration));
    assert!(graph.masks().is_empty());
    assert_eq!(graph.node(&LayerId::new("features.0")).unwrap().layer().weight().unwrap(), &before);
}

#[test]
fn test_wrong_batch_shape_rejected_before_mutation() {
    // TEST_ID: PRN-014
    let mut graph = tiny_cnn(3);
    let before = graph.node(&LayerId::new("features.0")).unwrap().layer().weight().unwrap().clone();
    let calibration = CalibrationData::new(vec![seeded_tensor(&[2, 3, 6, 6], 4)]);

    let err = prune(&mut graph, &calibration, &weight_only(0.5)).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }), "PRN-014 FALSIFIED: got {err:?}");
    assert!(graph.masks().is_empty(), "PRN-014 FALSIFIED: masks installed before the shape check");
    assert_eq!(graph.node(&LayerId::new("features.0")).unwrap().layer().weight().unwrap(), &before);
}

#[test]
fn test_activation_masks_match_weight_masks() {
    // TEST_ID: PRN-013
    let mut graph = tiny_cnn(4);
    let calibration = calibration_for(&graph, 2, 3, 9);
    let config = weight_only(0.25).with_activation(ActivationPruneConfig::default().with_sparsity(0.5));
    let outcome = prune(&mut graph, &calibration, &config).unwrap();

    assert_eq!(outcome.activation_masks.len(), outcome.weight_masks.len());
    assert_eq!(graph.masks().activation_count(), graph.masks().weight_count());

    let conv0 = graph.masks().activation(&LayerId::new("features.0")).unwrap();
    assert_eq!(conv0.shape(), &[2, 4, 6, 6]);
    assert_eq!(count_kept(conv0), 144);
    let fc = graph.masks().activation(&LayerId::new("classifier.1")).unwrap();
    assert_eq!(fc.shape(), &[2, 3]);
    assert_eq!(count_kept(fc), 3);
    assert_relative_eq!(outcome.metrics.activation_sparsity.unwrap(), (144.0 + 144.0 + 3.0) / 582.0);
}

#[test]
fn test_zero_sparsity_keeps_everything() {
    let mut graph = tiny_cnn(5);
    let calibration = calibration_for(&graph, 1, 1, 0);
    let outcome = prune(&mut graph, &calibration, &weight_only(0.0)).unwrap();
    assert!(outcome.weight_masks.iter().all(|(_, m)| count_kept(m) == m.len()));
    assert!(outcome.activation_masks.iter().all(|(_, m)| count_kept(m) == m.len()));
}

#[test]
fn test_global_scope_ranks_across_layers() {
    let mut graph = tiny_cnn(6);
    // features.0 holds the globally smallest weights.
    let id = LayerId::new("features.0");
    graph.node_mut(&id).unwrap().layer_mut().set_weight(ramp(&[4, 1, 3, 3], 1e-3)).unwrap();
    for other in ["features.2", "classifier.1"] {
        let other = LayerId::new(other);
        let shifted = graph.node(&other).unwrap().layer().weight().unwrap().mapv(|v| v + 2.0);
        graph.node_mut(&other).unwrap().layer_mut().set_weight(shifted).unwrap();
    }

    let calibration = calibration_for(&graph, 1, 1, 0);
    let config = PruneConfig::default()
        .with_weight(WeightPruneConfig::default().with_sparsity(0.1).with_scope(Scope::Global));
    let outcome = prune(&mut graph, &calibration, &config).unwrap();

    let total: usize = outcome.weight_masks.iter().map(|(_, m)| m.len()).sum();
    let pruned: usize = outcome.weight_masks.iter().map(|(_, m)| m.len() - count_kept(m)).sum();
    assert_eq!(pruned, prune_count(total, 0.1));
    // 28 weights go, all of them from the shrunken layer.
    let conv0 = graph.masks().weight(&id).unwrap();
    assert_eq!(conv0.total() - conv0.kept(), 28);
}

#[test]
fn test_random_method_is_seeded() {
    let config = PruneConfig::default().with_weight(
        WeightPruneConfig::default().with_method(PruneMethod::Random).with_seed(42),
    );
    let run = |seed| {
        let mut graph = tiny_cnn(seed);
        let calibration = calibration_for(&graph, 1, 1, 0);
        prune(&mut graph, &calibration, &config).unwrap().weight_masks
    };
    let a = run(1);
    let b = run(2);
    // Random scores ignore weight values, so the same seed gives the same masks.
    assert_eq!(a, b);
}

#[test]
fn test_method_names_and_stochasticity() {
    assert_eq!(PruneMethod::L1Norm.display_name(), "L1 norm");
    assert_eq!(PruneMethod::L2Norm.display_name(), "L2 norm");
    assert!(PruneMethod::Random.is_stochastic());
    assert!(!PruneMethod::L1Norm.is_stochastic() && !PruneMethod::L2Norm.is_stochastic());
}

#[test]
fn test_reprune_keeps_original_values() {
    let mut graph = single_conv_graph(2, 2, 3, 4, false);
    let id = LayerId::new("features.0");
    let original = graph.node(&id).unwrap().layer().weight().unwrap().clone();
    let calibration = calibration_for(&graph, 1, 1, 0);

    prune(&mut graph, &calibration, &weight_only(0.25)).unwrap();
    prune(&mut graph, &calibration, &weight_only(0.5)).unwrap();

    let mw = graph.masks().weight(&id).unwrap();
    assert_eq!(mw.values(), &original);
    assert_eq!(mw.total() - mw.kept(), 18);
    assert_eq!(graph.masks().weight_count(), 1, "re-pruning replaces the entry");
}

#[test]
fn test_zero_parameter_layer_is_skipped() {
    let fc = Linear::new(seeded_tensor(&[3, 4], 1), None).unwrap();
    let empty = Linear::new(seeded_tensor(&[0, 3], 2), None).unwrap();
    let mut graph = GraphBuilder::new("mlp", &[4])
        .layer(Layer::Linear(fc))
        .layer(Layer::Linear(empty))
        .build()
        .unwrap();
    let calibration = calibration_for(&graph, 2, 1, 0);
    let outcome = prune(&mut graph, &calibration, &weight_only(0.5)).unwrap();

    assert_eq!(outcome.weight_masks.len(), 1);
    assert_eq!(outcome.metrics.skipped_layers, vec!["1".to_string()]);
}

#[test]
fn test_add_pruning_metadata_annotates_nodes() {
    let mut graph = tiny_cnn(8);
    let calibration = calibration_for(&graph, 1, 1, 0);
    let config = weight_only(0.5).with_activation(ActivationPruneConfig::default().with_sparsity(0.5));
    prune(&mut graph, &calibration, &config).unwrap();

    let report = add_pruning_metadata(&mut graph).unwrap();
    assert_eq!(report.layers().len(), 3);
    assert_relative_eq!(report.overall_weight_sparsity(), 0.5);

    let meta = graph.metadata(&LayerId::new("features.2")).unwrap();
    assert_relative_eq!(meta.get_f64(WEIGHT_SPARSITY).unwrap(), 0.5);
    assert_relative_eq!(meta.get_f64(ACTIVATION_SPARSITY).unwrap(), 0.5);
}

#[test]
fn test_add_pruning_metadata_count_mismatch() {
    let mut graph = tiny_cnn(8);
    let calibration = calibration_for(&graph, 1, 1, 0);
    prune(&mut graph, &calibration, &weight_only(0.5)).unwrap();
    graph.masks_mut().clear_activations();

    let err = add_pruning_metadata(&mut graph).unwrap_err();
    assert!(matches!(err, Error::MaskCountMismatch { weight_masks: 3, activation_masks: 0 }));
}

#[test]
fn test_metrics_variance() {
    let mut metrics = PruningMetrics::new(0.5);
    metrics.add_layer_sparsity("a", 0.4);
    metrics.add_layer_sparsity("b", 0.6);
    assert_relative_eq!(metrics.mean_layer_sparsity(), 0.5);
    assert_relative_eq!(metrics.layer_sparsity_variance(), 0.01, epsilon = 1e-12);
    metrics.update_sparsity(5, 10);
    assert_relative_eq!(metrics.sparsity_gap(), 0.0);
    assert_eq!(metrics.parameters_remaining, 5);
}

#[test]
fn test_synthetic_calibration_shape() {
    let data = CalibrationData::synthetic(&[1, 6, 6], 4, 2, 0);
    assert_eq!(data.len(), 2);
    assert_eq!(data.first_batch().unwrap().shape(), &[4, 1, 6, 6]);
    assert_eq!(data.num_samples(), 8);
}
