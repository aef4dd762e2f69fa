use super::*;
use crate::accounting::AccountingSnapshot;
use crate::graph::QuantizationState;
use crate::prune::{prune, PruneConfig, WeightPruneConfig};
use crate::quant::{quantize, QuantizeConfig};
use crate::test_support::{calibration_for, tiny_cnn};
use crate::ErrorClass;

fn assert_same_parameters(a: &Graph, b: &Graph) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.nodes().iter().zip(b.nodes()) {
        assert_eq!(x.id(), y.id());
        assert_eq!(x.op(), y.op());
        assert_eq!(x.layer().weight(), y.layer().weight(), "weight of {}", x.id());
        assert_eq!(x.layer().bias(), y.layer().bias(), "bias of {}", x.id());
    }
}

#[test]
fn test_round_trip_dense_graph() {
    // TEST_ID: CKP-001
    let dir = tempfile::tempdir().unwrap();
    let graph = tiny_cnn(21);
    save(&graph, dir.path()).unwrap();

    for file in [GRAPH_FILE, PARAMETERS_FILE, MASKS_FILE] {
        assert!(dir.path().join(file).is_file(), "CKP-001 FALSIFIED: {file} not written");
    }

    let loaded = load(dir.path()).unwrap();
    assert_same_parameters(&graph, &loaded);
    assert_eq!(loaded.name(), graph.name());
    assert_eq!(loaded.input_shape(), graph.input_shape());
    assert!(loaded.masks().is_empty());
    assert!(!loaded.is_quantized());
}

#[test]
fn test_round_trip_preserves_masks_and_quantization() {
    // TEST_ID: CKP-002
    let dir = tempfile::tempdir().unwrap();
    let mut graph = tiny_cnn(22);
    let calibration = calibration_for(&graph, 2, 1, 22);
    let config = PruneConfig::default().with_weight(WeightPruneConfig::default().with_sparsity(0.5));
    prune(&mut graph, &calibration, &config).unwrap();
    quantize(&mut graph, &QuantizeConfig::default().with_bits(6)).unwrap();
    save(&graph, dir.path()).unwrap();

    let loaded = load(dir.path()).unwrap();
    assert_same_parameters(&graph, &loaded);
    assert_eq!(loaded.quantization(), QuantizationState::quantized(6));

    let original: Vec<_> = graph.masks().weights().collect();
    let restored: Vec<_> = loaded.masks().weights().collect();
    assert_eq!(original, restored, "CKP-002 FALSIFIED: weight masks differ after load");
    assert_eq!(loaded.masks().activation_count(), graph.masks().activation_count());

    assert_eq!(
        AccountingSnapshot::capture(&loaded).unwrap(),
        AccountingSnapshot::capture(&graph).unwrap(),
        "accounting must not change across a checkpoint"
    );
}

#[test]
fn test_metadata_survives() {
    let dir = tempfile::tempdir().unwrap();
    let mut graph = tiny_cnn(23);
    let id = LayerId::new("features.2");
    graph.metadata_mut(&id).unwrap().insert("note", "kept");
    save(&graph, dir.path()).unwrap();

    let loaded = load(dir.path()).unwrap();
    let meta = loaded.metadata(&id).unwrap();
    assert_eq!(meta.get("note").and_then(|v| v.as_str()), Some("kept"));
    assert_eq!(meta.shape(crate::graph::OUTPUT_SHAPE), Some(vec![1, 4, 6, 6]));
}

#[test]
fn test_missing_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, Error::CheckpointNotFound { .. }));
    assert_eq!(err.class(), ErrorClass::Io);
}

#[test]
fn test_missing_masks_file() {
    let dir = tempfile::tempdir().unwrap();
    save(&tiny_cnn(24), dir.path()).unwrap();
    std::fs::remove_file(dir.path().join(MASKS_FILE)).unwrap();
    let err = load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::CheckpointNotFound { ref path } if path.ends_with(MASKS_FILE)));
}

#[test]
fn test_corrupt_parameters_rejected() {
    let dir = tempfile::tempdir().unwrap();
    save(&tiny_cnn(25), dir.path()).unwrap();
    std::fs::write(dir.path().join(PARAMETERS_FILE), b"not safetensors").unwrap();
    let err = load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}
