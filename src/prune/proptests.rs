//! Property-based tests for mask selection

use super::criterion::{global_masks, local_mask, prune_count};
use super::{Granularity, PruneMethod};
use crate::tensor::{count_kept, tensor_from_vec};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn arb_method() -> impl Strategy<Value = PruneMethod> {
    prop_oneof![Just(PruneMethod::L1Norm), Just(PruneMethod::L2Norm), Just(PruneMethod::Random)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_local_mask_prunes_exactly_floor(
        values in prop::collection::vec(-10.0f32..10.0, 1..200),
        sparsity in 0.0f64..0.999,
        method in arb_method(),
        seed in any::<u64>(),
    ) {
        let n = values.len();
        let t = tensor_from_vec(&[n], values).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mask = local_mask(&t, sparsity, method, Granularity::Element, &mut rng);
        prop_assert_eq!(n - count_kept(&mask), prune_count(n, sparsity));
    }

    #[test]
    fn prop_kept_magnitudes_dominate_pruned(
        values in prop::collection::vec(-10.0f32..10.0, 1..100),
        sparsity in 0.0f64..0.999,
    ) {
        let n = values.len();
        let t = tensor_from_vec(&[n], values.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mask = local_mask(&t, sparsity, PruneMethod::L1Norm, Granularity::Element, &mut rng);
        let max_pruned = values.iter().zip(mask.iter()).filter(|(_, k)| !**k).map(|(v, _)| v.abs()).fold(0.0f32, f32::max);
        let min_kept = values.iter().zip(mask.iter()).filter(|(_, k)| **k).map(|(v, _)| v.abs()).fold(f32::INFINITY, f32::min);
        prop_assert!(max_pruned <= min_kept);
    }

    #[test]
    fn prop_channel_mask_is_uniform_per_channel(
        channels in 1usize..8,
        per_channel in 1usize..10,
        sparsity in 0.0f64..0.999,
        seed in any::<u64>(),
    ) {
        let values: Vec<f32> = (0..channels * per_channel).map(|i| ((i * 7919) % 101) as f32 - 50.0).collect();
        let t = tensor_from_vec(&[channels, per_channel], values).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mask = local_mask(&t, sparsity, PruneMethod::L1Norm, Granularity::Channel, &mut rng);
        let mut dropped = 0;
        for row in mask.outer_iter() {
            let kept = row.iter().filter(|&&k| k).count();
            prop_assert!(kept == 0 || kept == per_channel);
            if kept == 0 {
                dropped += 1;
            }
        }
        prop_assert_eq!(dropped, prune_count(channels, sparsity));
    }

    #[test]
    fn prop_global_mask_total_is_floor(
        a in prop::collection::vec(-1.0f32..1.0, 1..50),
        b in prop::collection::vec(-1.0f32..1.0, 1..50),
        sparsity in 0.0f64..0.999,
    ) {
        let ta = tensor_from_vec(&[a.len()], a).unwrap();
        let tb = tensor_from_vec(&[b.len()], b).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let masks = global_masks(&[&ta, &tb], sparsity, PruneMethod::L1Norm, Granularity::Element, &mut rng);
        let total = ta.len() + tb.len();
        let pruned: usize = masks.iter().map(|m| m.len() - count_kept(m)).sum();
        prop_assert_eq!(pruned, prune_count(total, sparsity));
    }
}
