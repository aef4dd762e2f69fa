//! Huffman entropy coding of quantized weights.
//!
//! A deterministic, prefix-free codebook is built from symbol frequencies;
//! symbols are encoded into a packed [`BitStream`] and decoded losslessly.

mod bitstream;
mod codebook;
mod codec;
mod pass;

#[cfg(test)]
mod proptests;

pub use bitstream::BitStream;
pub use codebook::Codebook;
pub use codec::{decode, encode};
pub use pass::{decode_layers, huffman_encode, EncodedLayer, HuffmanConfig, HuffmanOutcome, Pooling};
