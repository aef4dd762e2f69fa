//! Tests for quantization.

use super::*;
use crate::graph::{LayerId, OpKind};
use crate::mask::{effective, MaskedWeight};
use crate::prune::{prune, PruneConfig, WeightPruneConfig};
use crate::tensor::{full_mask, tensor_from_vec};
use crate::test_support::{calibration_for, seeded_tensor, single_conv_graph, tiny_cnn};
use crate::{Error, ErrorClass};
use approx::assert_relative_eq;
use proptest::prelude::*;

// =============================================================================
// Quantizer
// =============================================================================

#[test]
fn test_symmetric_range() {
    // TEST_ID: QNT-001
    let q4 = UniformQuantizer::new(QuantScheme::Symmetric, 4);
    assert_eq!((q4.qmin(), q4.qmax()), (-7, 7));
    let q8 = UniformQuantizer::new(QuantScheme::Asymmetric, 8);
    assert_eq!((q8.qmin(), q8.qmax()), (0, 255));
    let fx = UniformQuantizer::new(QuantScheme::FixedPoint { frac_width: 4 }, 8);
    assert_eq!((fx.qmin(), fx.qmax()), (-128, 127));
}

#[test]
fn test_symmetric_calibration() {
    let q = UniformQuantizer::new(QuantScheme::Symmetric, 8);
    let params = q.calibrate(&[-2.54, 1.0, 0.5]);
    assert_relative_eq!(params.scale, 2.54 / 127.0, epsilon = 1e-7);
    assert_eq!(params.zero_point, 0);
    assert_relative_eq!(q.fake_quantize(-2.54, params), -2.54, epsilon = 1e-5);
}

#[test]
fn test_fixed_point_grid() {
    let q = UniformQuantizer::new(QuantScheme::FixedPoint { frac_width: 2 }, 4);
    let params = q.calibrate(&Vec::<f32>::new());
    assert_relative_eq!(params.scale, 0.25);
    assert_relative_eq!(q.fake_quantize(0.3, params), 0.25);
    // Clamped to qmax = 7 -> 1.75.
    assert_relative_eq!(q.fake_quantize(5.0, params), 1.75);
    assert_relative_eq!(q.fake_quantize(-5.0, params), -2.0);
}

#[test]
fn test_asymmetric_all_positive_keeps_zero() {
    let q = UniformQuantizer::new(QuantScheme::Asymmetric, 8);
    let params = q.calibrate(&[1.0, 2.0, 3.0]);
    assert_eq!(q.fake_quantize(0.0, params), 0.0);
    assert_relative_eq!(q.fake_quantize(3.0, params), 3.0, epsilon = 1e-2);
}

#[test]
fn test_per_channel_params() {
    let t = tensor_from_vec(&[2, 2], vec![1.0, -1.0, 10.0, -10.0]).unwrap();
    let q = UniformQuantizer::new(QuantScheme::Symmetric, 8);
    let (_, params) = q.quantize_tensor(&t, QuantGranularity::PerChannel);
    assert_eq!(params.len(), 2);
    assert_relative_eq!(params[1].scale / params[0].scale, 10.0, epsilon = 1e-5);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_zero_maps_to_zero(
        values in prop::collection::vec(-100.0f32..100.0, 0..50),
        bits in 2u8..=16,
        scheme_idx in 0usize..3,
    ) {
        let scheme = [
            QuantScheme::Symmetric,
            QuantScheme::Asymmetric,
            QuantScheme::FixedPoint { frac_width: bits - 1 },
        ][scheme_idx];
        let q = UniformQuantizer::new(scheme, bits);
        let params = q.calibrate(&values);
        prop_assert_eq!(q.fake_quantize(0.0, params), 0.0);
    }

    #[test]
    fn prop_symmetric_error_bounded(values in prop::collection::vec(-10.0f32..10.0, 1..50)) {
        let q = UniformQuantizer::new(QuantScheme::Symmetric, 8);
        let params = q.calibrate(&values);
        for &v in &values {
            prop_assert!((q.fake_quantize(v, params) - v).abs() <= params.scale * 0.5 + 1e-5);
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_validation() {
    // TEST_ID: QNT-010
    assert!(QuantizeConfig::default().validate().is_ok());
    for bits in [0, 1, 17] {
        let err = QuantizeConfig::default().with_bits(bits).validate().unwrap_err();
        assert_eq!(err.class(), ErrorClass::Configuration, "QNT-010 FALSIFIED: bits {bits}");
    }
    let err = QuantizeConfig::default()
        .with_bits(4)
        .with_scheme(QuantScheme::FixedPoint { frac_width: 4 })
        .validate()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    let err = QuantizeConfig::default().with_types(&[OpKind::Relu]).validate().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn test_config_from_yaml() {
    let yaml = "by: type\ntargets: [conv2d, linear]\nscheme:\n  fixed_point:\n    frac_width: 3\nbits: 6\ngranularity: per_channel\n";
    let config: QuantizeConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.bits(), 6);
    assert_eq!(config.scheme(), QuantScheme::FixedPoint { frac_width: 3 });
    assert_eq!(config.granularity(), QuantGranularity::PerChannel);
    assert_eq!(config.target_ops().unwrap(), vec![OpKind::Conv2d, OpKind::Linear]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_scheme_accepts_plain_and_map_forms() {
    // TEST_ID: QNT-011
    let plain: QuantizeConfig = serde_yaml::from_str("scheme: asymmetric\n").unwrap();
    assert_eq!(plain.scheme(), QuantScheme::Asymmetric);

    let fixed: QuantizeConfig =
        serde_yaml::from_str("scheme:\n  fixed_point:\n    frac_width: 5\nbits: 8\n").unwrap();
    assert_eq!(
        fixed.scheme(),
        QuantScheme::FixedPoint { frac_width: 5 },
        "QNT-011 FALSIFIED: fixed_point map form not parsed"
    );

    let yaml = serde_yaml::to_string(&fixed).unwrap();
    assert!(yaml.contains("fixed_point:"), "QNT-011 FALSIFIED: scheme written as {yaml}");
    let back: QuantizeConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, fixed);

    let plan = crate::pipeline::PipelinePlan::from_yaml_str(
        "quantize:\n  scheme:\n    fixed_point:\n      frac_width: 4\n  bits: 8\n",
    )
    .unwrap();
    assert_eq!(plan.len(), 1);
}

// =============================================================================
// Engine
// =============================================================================

#[test]
fn test_quantize_marks_graph_and_metadata() {
    // TEST_ID: QNT-020
    let mut graph = tiny_cnn(1);
    let outcome = quantize(&mut graph, &QuantizeConfig::default()).unwrap();

    assert!(graph.is_quantized());
    assert_eq!(graph.quantization().bits, Some(8));
    let ids: Vec<&str> = outcome.layers.iter().map(|l| l.layer.as_str()).collect();
    assert_eq!(ids, vec!["features.0", "features.2"], "default selects conv2d only");

    let meta = graph.metadata(&LayerId::new("features.0")).unwrap();
    assert!(meta.get_f64(QUANT_SCALE).unwrap() > 0.0);
    assert_eq!(meta.get_f64(QUANT_BITS), Some(8.0));
}

#[test]
fn test_quantized_values_lie_on_grid() {
    let mut graph = single_conv_graph(1, 2, 3, 4, true);
    let outcome = quantize(&mut graph, &QuantizeConfig::default().with_bits(4)).unwrap();
    let scale = outcome.layers[0].params[0].scale;
    let w = graph.node(&LayerId::new("features.0")).unwrap().layer().weight().unwrap();
    for &v in w.iter() {
        let steps = v / scale;
        assert!((steps - steps.round()).abs() < 1e-4);
        assert!(steps.round().abs() <= 7.0);
    }
}

#[test]
fn test_storage_reported_separately() {
    // 4x4x2x2 weights, no bias.
    let mut graph = single_conv_graph(4, 4, 2, 4, false);
    let outcome = quantize(&mut graph, &QuantizeConfig::default().with_bits(4)).unwrap();
    assert_eq!(outcome.storage_bits_8bit, 64 * 8);
    assert_eq!(outcome.storage_bits_configured, 64 * 4);
}

#[test]
fn test_prune_then_quantize_keeps_zeros() {
    // TEST_ID: QNT-021
    let mut graph = tiny_cnn(3);
    let calibration = calibration_for(&graph, 1, 1, 0);
    prune(
        &mut graph,
        &calibration,
        &PruneConfig::default().with_weight(WeightPruneConfig::default().with_sparsity(0.6)),
    )
    .unwrap();
    quantize(&mut graph, &QuantizeConfig::default().with_types(&[OpKind::Conv2d, OpKind::Linear]))
        .unwrap();

    for (id, mw) in graph.masks().weights() {
        let live = graph.node(id).unwrap().layer().weight().unwrap();
        for (&v, &keep) in live.iter().zip(mw.mask().iter()) {
            if !keep {
                assert_eq!(v, 0.0, "QNT-021 FALSIFIED: masked position of {id} became non-zero");
            }
        }
        assert_eq!(live, &effective(mw));
    }
}

#[test]
fn test_stale_mask_rejected_before_mutation() {
    let mut graph = single_conv_graph(1, 2, 3, 4, false);
    let id = LayerId::new("features.0");
    let stale = MaskedWeight::new(seeded_tensor(&[2, 1, 1, 1], 0), full_mask(&[2, 1, 1, 1])).unwrap();
    graph.masks_mut().insert_weight(id.clone(), stale);
    let before = graph.node(&id).unwrap().layer().weight().unwrap().clone();

    let err = quantize(&mut graph, &QuantizeConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MaskShapeMismatch { .. }));
    assert!(!graph.is_quantized());
    assert_eq!(graph.node(&id).unwrap().layer().weight().unwrap(), &before);
}

#[test]
fn test_select_by_name() {
    let mut graph = tiny_cnn(2);
    let config = QuantizeConfig::default().with_layers(["classifier.1"]);
    let outcome = quantize(&mut graph, &config).unwrap();
    assert_eq!(outcome.layers.len(), 1);
    assert_eq!(outcome.layers[0].layer.as_str(), "classifier.1");

    let err = quantize(&mut graph, &QuantizeConfig::default().with_layers(["nope"])).unwrap_err();
    assert!(matches!(err, Error::UnknownLayer { .. }));
}

#[test]
fn test_bias_left_alone_when_disabled() {
    let mut graph = single_conv_graph(1, 2, 3, 4, true);
    let id = LayerId::new("features.0");
    let bias = graph.node(&id).unwrap().layer().bias().unwrap().clone();
    quantize(&mut graph, &QuantizeConfig::default().with_bits(2).with_quantize_bias(false)).unwrap();
    assert_eq!(graph.node(&id).unwrap().layer().bias().unwrap(), &bias);
}
