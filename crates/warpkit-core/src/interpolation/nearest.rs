//! Nearest neighbor interpolation implementation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::boundary::columns;
use super::trait_::Interpolator;
use crate::space::grid::strides;

/// Nearest Neighbor Interpolator.
///
/// Performs nearest neighbor interpolation. Ties round up, so a half-node
/// offset picks the same neighbour on every axis and at every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest neighbor interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(&self, data: &Tensor<B, 1>, shape: &[usize], indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let strides = strides(shape);
        let [batch, _] = indices.dims();
        let device = indices.device();

        let mut idx = Tensor::<B, 1, burn::tensor::Int>::zeros([batch], &device);
        for ((x, &n), stride) in columns(indices).into_iter().zip(shape).zip(strides) {
            // Round half up and clamp
            let i = x.add_scalar(0.5).floor().clamp(0.0, (n - 1) as f64).int();
            idx = idx + i * stride as i32;
        }
        data.clone().gather(0, idx)
    }
}
