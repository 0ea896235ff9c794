//! Interpolator trait for sampling values at continuous coordinates.
//!
//! This module defines the core Interpolator trait that all interpolation methods must implement.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Interpolator trait for sampling values at continuous coordinates.
///
/// Interpolators sample grid data at non-integer indices. Data is passed
/// flattened in row-major order together with its grid shape, so a single
/// implementation serves any number of axes.
///
/// Callers handle out-of-grid indices before interpolating; implementations
/// clamp neighbour lookups to the grid.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend>: Send + Sync {
    /// Interpolate values at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - Flattened grid values `[N]`, row-major over `shape`
    /// * `shape` - Grid shape
    /// * `indices` - The indices at which to interpolate `[Batch, shape.len()]`
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate(&self, data: &Tensor<B, 1>, shape: &[usize], indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
