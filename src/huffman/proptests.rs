//! Property-based tests for Huffman coding

use super::{decode, encode, Codebook};
use proptest::prelude::*;
use std::collections::HashMap;

fn frequencies(symbols: &[u32]) -> HashMap<u32, usize> {
    let mut freq = HashMap::new();
    for &s in symbols {
        *freq.entry(s).or_insert(0) += 1;
    }
    freq
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_round_trip(symbols in prop::collection::vec(0u32..32, 0..300)) {
        let book = Codebook::build(&symbols);
        let stream = encode(&book, &symbols).unwrap();
        prop_assert_eq!(decode(&book, &stream).unwrap(), symbols);
    }

    #[test]
    fn prop_round_trip_finite_floats(values in prop::collection::vec(-1.0e6f32..1.0e6, 0..200)) {
        let symbols: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
        let book = Codebook::build(&symbols);
        let stream = encode(&book, &symbols).unwrap();
        let decoded: Vec<f32> = decode(&book, &stream).unwrap().into_iter().map(f32::from_bits).collect();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn prop_prefix_free(symbols in prop::collection::vec(0u32..64, 1..300)) {
        let book = Codebook::build(&symbols);
        prop_assert!(book.is_prefix_free());
    }

    #[test]
    fn prop_frequent_symbols_never_longer(symbols in prop::collection::vec(0u32..16, 1..300)) {
        let book = Codebook::build(&symbols);
        let freq = frequencies(&symbols);
        for (a, fa) in &freq {
            for (b, fb) in &freq {
                if fa > fb {
                    let la = book.code(a).unwrap().len();
                    let lb = book.code(b).unwrap().len();
                    prop_assert!(la <= lb, "freq {} -> len {}, freq {} -> len {}", fa, la, fb, lb);
                }
            }
        }
    }

    #[test]
    fn prop_kraft_equality(symbols in prop::collection::vec(0u32..16, 1..300)) {
        let book = Codebook::build(&symbols);
        if book.len() > 1 {
            let sum: f64 = book.entries().map(|(_, c)| 0.5f64.powi(c.len() as i32)).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }
    }
}
