//! Huffman codebook construction.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

/// A node in the Huffman tree, stored in an arena.
#[derive(Debug, Clone)]
enum HuffmanNode<S> {
    Leaf { symbol: S },
    Internal { zero: usize, one: usize },
}

/// Prefix-free code for every symbol of an alphabet.
///
/// Entries are kept in first-appearance order of the symbols.
#[derive(Debug, Clone, Serialize)]
pub struct Codebook<S> {
    entries: Vec<(S, Vec<bool>)>,
    #[serde(skip)]
    index: HashMap<S, usize>,
}

impl<S: Copy + Eq + Hash> Codebook<S> {
    /// Build an optimal code for the symbol frequencies of `symbols`.
    ///
    /// The two lowest-frequency nodes are merged repeatedly. Ties are broken
    /// by a sequence number: leaves are numbered in first-appearance order
    /// and merged nodes after them, so the codebook is deterministic. The
    /// first node popped gets bit 0. A one-symbol alphabet gets the code `0`.
    pub fn build(symbols: &[S]) -> Self {
        let mut freq: Vec<(S, usize)> = Vec::new();
        let mut position: HashMap<S, usize> = HashMap::new();
        for &s in symbols {
            match position.get(&s) {
                Some(&i) => freq[i].1 += 1,
                None => {
                    position.insert(s, freq.len());
                    freq.push((s, 1));
                }
            }
        }
        Self::from_frequencies(&freq)
    }

    /// Build from `(symbol, frequency)` pairs given in first-appearance order.
    pub fn from_frequencies(freq: &[(S, usize)]) -> Self {
        match freq {
            [] => Self::from_entries(Vec::new()),
            [(symbol, _)] => Self::from_entries(vec![(*symbol, vec![false])]),
            _ => {
                let mut arena: Vec<HuffmanNode<S>> = Vec::with_capacity(2 * freq.len());
                let mut heap = BinaryHeap::with_capacity(freq.len());
                for (seq, &(symbol, f)) in freq.iter().enumerate() {
                    arena.push(HuffmanNode::Leaf { symbol });
                    heap.push(Reverse((f, seq, seq)));
                }

                let mut next_seq = freq.len();
                while heap.len() > 1 {
                    let (Some(Reverse((f0, _, zero))), Some(Reverse((f1, _, one)))) = (heap.pop(), heap.pop())
                    else {
                        break;
                    };
                    arena.push(HuffmanNode::Internal { zero, one });
                    heap.push(Reverse((f0 + f1, next_seq, arena.len() - 1)));
                    next_seq += 1;
                }

                let mut codes: HashMap<S, Vec<bool>> = HashMap::with_capacity(freq.len());
                walk(&arena, arena.len() - 1, &mut Vec::new(), &mut codes);
                let entries = freq
                    .iter()
                    .filter_map(|(s, _)| codes.remove(s).map(|c| (*s, c)))
                    .collect();
                Self::from_entries(entries)
            }
        }
    }

    fn from_entries(entries: Vec<(S, Vec<bool>)>) -> Self {
        let index = entries.iter().enumerate().map(|(i, (s, _))| (*s, i)).collect();
        Self { entries, index }
    }

    /// Code of `symbol`, if it is part of the alphabet.
    pub fn code(&self, symbol: &S) -> Option<&[bool]> {
        self.index.get(symbol).map(|&i| self.entries[i].1.as_slice())
    }

    /// `(symbol, code)` pairs in first-appearance order.
    pub fn entries(&self) -> impl Iterator<Item = (&S, &[bool])> {
        self.entries.iter().map(|(s, c)| (s, c.as_slice()))
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the longest code.
    pub fn max_code_len(&self) -> usize {
        self.entries.iter().map(|(_, c)| c.len()).max().unwrap_or(0)
    }

    /// No code is a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        self.entries.iter().enumerate().all(|(i, (_, a))| {
            self.entries
                .iter()
                .enumerate()
                .all(|(j, (_, b))| i == j || !(a.len() <= b.len() && b.starts_with(a)))
        })
    }
}

fn walk<S: Copy + Eq + Hash>(
    arena: &[HuffmanNode<S>],
    node: usize,
    prefix: &mut Vec<bool>,
    codes: &mut HashMap<S, Vec<bool>>,
) {
    match &arena[node] {
        HuffmanNode::Leaf { symbol } => {
            codes.insert(*symbol, prefix.clone());
        }
        HuffmanNode::Internal { zero, one } => {
            prefix.push(false);
            walk(arena, *zero, prefix, codes);
            prefix.pop();
            prefix.push(true);
            walk(arena, *one, prefix, codes);
            prefix.pop();
        }
    }
}
