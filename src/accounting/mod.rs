//! Resource accounting: storage, parameter counts and FLOPs.
//!
//! Everything here is a pure function of a graph and its mask store. Only
//! convolutional layers are counted.

mod flops;
mod reduction;
mod snapshot;
mod storage;


pub use flops::{flops, FlopCount};
pub use reduction::Reduction;
pub use snapshot::{AccountingDelta, AccountingSnapshot};
pub use storage::{
    bits_to_bytes, conv_parameter_count, storage_bits, storage_bits_at, ParameterCount,
    FULL_PRECISION_BITS, QUANTIZED_BITS,
};
