//! Mask store: static weight masks and dynamic activation masks.
//!
//! Pruned weights are held as a [`MaskedWeight`] (`values` + `mask`); the
//! live weight in the graph is always [`effective`] of that pair, so masks
//! survive quantization and retraining unchanged.

mod masked_weight;
mod report;
mod store;


pub use masked_weight::{effective, MaskedWeight};
pub use report::{LayerSparsity, SparsityReport};
pub use store::MaskStore;
