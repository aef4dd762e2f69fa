//! Reversible weight masking.

use crate::tensor::{count_kept, Mask, Tensor};
use crate::{Error, Result};
use ndarray::Zip;

/// A weight decomposed into its original values and a static keep-mask.
///
/// The live parameter of a pruned layer always equals [`effective`] of its
/// entry in the mask store.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedWeight {
    values: Tensor,
    mask: Mask,
}

impl MaskedWeight {
    /// Pair original values with a mask of the same shape.
    pub fn new(values: Tensor, mask: Mask) -> Result<Self> {
        if values.shape() != mask.shape() {
            return Err(Error::shape_mismatch("masked weight", values.shape(), mask.shape()));
        }
        Ok(Self { values, mask })
    }

    /// Original (unmasked) values.
    pub fn values(&self) -> &Tensor {
        &self.values
    }

    /// Keep-mask.
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn shape(&self) -> &[usize] {
        self.mask.shape()
    }

    /// Replace the original values; the mask is untouched.
    pub fn set_values(&mut self, values: Tensor) -> Result<()> {
        if values.shape() != self.mask.shape() {
            return Err(Error::shape_mismatch("masked weight values", self.mask.shape(), values.shape()));
        }
        self.values = values;
        Ok(())
    }

    /// Fold updated live values back into the originals at kept positions.
    ///
    /// Masked positions keep their original value: no gradient reaches them.
    pub fn fold_live(&mut self, live: &Tensor) -> Result<()> {
        if live.shape() != self.mask.shape() {
            return Err(Error::shape_mismatch("live weight", self.mask.shape(), live.shape()));
        }
        Zip::from(&mut self.values)
            .and(&self.mask)
            .and(live)
            .for_each(|v, &keep, &l| {
                if keep {
                    *v = l;
                }
            });
        Ok(())
    }

    /// Number of kept elements.
    pub fn kept(&self) -> usize {
        count_kept(&self.mask)
    }

    /// Total number of elements.
    pub fn total(&self) -> usize {
        self.mask.len()
    }

    /// Fraction of masked-out elements.
    pub fn sparsity(&self) -> f64 {
        crate::tensor::sparsity(&self.mask)
    }
}

/// Effective weight `values ⊙ mask`.
pub fn effective(mw: &MaskedWeight) -> Tensor {
    Zip::from(&mw.values)
        .and(&mw.mask)
        .map_collect(|&v, &keep| if keep { v } else { 0.0 })
}
