//! Tensor and mask aliases over `ndarray`.

use ndarray::{ArrayD, IxDyn};

/// Dense f32 tensor with dynamic rank (NCHW for activations, OIHW for conv weights).
pub type Tensor = ArrayD<f32>;

/// Boolean keep-mask; `true` marks an element that survives pruning.
pub type Mask = ArrayD<bool>;

/// Build a tensor from a shape and row-major data.
pub fn tensor_from_vec(shape: &[usize], data: Vec<f32>) -> crate::Result<Tensor> {
    let expected: usize = shape.iter().product();
    if expected != data.len() {
        return Err(crate::Error::shape_mismatch("tensor construction", &[expected], &[data.len()]));
    }
    ArrayD::from_shape_vec(IxDyn(shape), data)
        .map_err(|e| crate::Error::Serialization(format!("tensor layout: {e}")))
}

/// Build a mask from a shape and row-major flags.
pub fn mask_from_vec(shape: &[usize], data: Vec<bool>) -> crate::Result<Mask> {
    let expected: usize = shape.iter().product();
    if expected != data.len() {
        return Err(crate::Error::shape_mismatch("mask construction", &[expected], &[data.len()]));
    }
    ArrayD::from_shape_vec(IxDyn(shape), data)
        .map_err(|e| crate::Error::Serialization(format!("mask layout: {e}")))
}

/// All-true mask with the given shape.
pub fn full_mask(shape: &[usize]) -> Mask {
    ArrayD::from_elem(IxDyn(shape), true)
}

/// Number of kept (`true`) entries.
pub fn count_kept(mask: &Mask) -> usize {
    mask.iter().filter(|&&m| m).count()
}

/// Fraction of kept entries; an empty mask counts as fully kept.
pub fn kept_fraction(mask: &Mask) -> f64 {
    if mask.is_empty() {
        return 1.0;
    }
    count_kept(mask) as f64 / mask.len() as f64
}

/// Fraction of masked-out entries.
pub fn sparsity(mask: &Mask) -> f64 {
    1.0 - kept_fraction(mask)
}
