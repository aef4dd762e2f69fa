//! Encoding to and decoding from packed bitstreams.

use super::bitstream::BitStream;
use super::codebook::Codebook;
use crate::{Error, Result};
use std::hash::Hash;

/// Concatenate the codes of `symbols`.
pub fn encode<S: Copy + Eq + Hash>(codebook: &Codebook<S>, symbols: &[S]) -> Result<BitStream> {
    let mut stream = BitStream::new();
    for s in symbols {
        let code = codebook.code(s).ok_or(Error::UnknownSymbol)?;
        stream.extend_from_bits(code);
    }
    Ok(stream)
}

/// Binary decode tree; node 0 is the root.
struct DecodeTree<S> {
    children: Vec<[Option<usize>; 2]>,
    symbols: Vec<Option<S>>,
}

impl<S: Copy + Eq + Hash> DecodeTree<S> {
    fn new(codebook: &Codebook<S>) -> Self {
        let mut tree = Self { children: vec![[None, None]], symbols: vec![None] };
        for (symbol, code) in codebook.entries() {
            let mut node = 0;
            for &bit in code {
                let slot = usize::from(bit);
                node = match tree.children[node][slot] {
                    Some(child) => child,
                    None => {
                        tree.children.push([None, None]);
                        tree.symbols.push(None);
                        let child = tree.children.len() - 1;
                        tree.children[node][slot] = Some(child);
                        child
                    }
                };
            }
            tree.symbols[node] = Some(*symbol);
        }
        tree
    }
}

/// Decode a stream produced by [`encode`] with the same codebook.
///
/// A stream that ends inside a code is a [`Error::TruncatedBitStream`].
pub fn decode<S: Copy + Eq + Hash>(codebook: &Codebook<S>, stream: &BitStream) -> Result<Vec<S>> {
    let tree = DecodeTree::new(codebook);
    let mut out = Vec::new();
    let mut node = 0;
    let mut depth = 0;
    for bit in stream.iter() {
        node = tree.children[node][usize::from(bit)].ok_or(Error::UnknownSymbol)?;
        depth += 1;
        if let Some(symbol) = tree.symbols[node] {
            out.push(symbol);
            node = 0;
            depth = 0;
        }
    }
    if depth != 0 {
        return Err(Error::TruncatedBitStream { dangling: depth });
    }
    Ok(out)
}
