//! Linear interpolation implementation.
//!
//! This module provides multilinear interpolation (bilinear for 2D,
//! trilinear for 3D) over grids with any number of axes.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use super::boundary::columns;
use super::trait_::Interpolator;
use crate::space::grid::strides;

/// Linear Interpolator.
///
/// Blends the `2^D` grid nodes surrounding each index. At an exact node all
/// weights but one are zero, so stored values come back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }

    /// Interpolate row vectors stored per grid node.
    ///
    /// # Arguments
    /// * `rows` - Node values `[N, C]`, one row per node in row-major order
    /// * `shape` - Grid shape
    /// * `indices` - Continuous indices `[Batch, shape.len()]`
    ///
    /// # Returns
    /// Tensor of interpolated rows `[Batch, C]`
    pub fn interpolate_rows<B: Backend>(
        &self,
        rows: &Tensor<B, 2>,
        shape: &[usize],
        indices: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [batch, _] = indices.dims();
        let channels = rows.dims()[1];
        let mut acc = Tensor::<B, 2>::zeros([batch, channels], &indices.device());
        for (idx, weight) in corners(indices, shape) {
            acc = acc + rows.clone().select(0, idx) * weight.reshape([batch, 1]);
        }
        acc
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 1>, shape: &[usize], indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch, _] = indices.dims();
        let device = indices.device();
        let mut acc = Tensor::<B, 1>::zeros([batch], &device);
        for (idx, weight) in corners(indices, shape) {
            acc = acc + data.clone().gather(0, idx) * weight;
        }
        acc
    }
}

/// Flat node offsets and weights of the `2^D` corners around each index.
pub(crate) fn corners<B: Backend>(indices: Tensor<B, 2>, shape: &[usize]) -> Vec<(Tensor<B, 1, Int>, Tensor<B, 1>)> {
    let strides = strides(shape);

    // Per axis: (lower index, upper index, lower weight, upper weight)
    let axes: Vec<_> = columns(indices)
        .into_iter()
        .zip(shape)
        .map(|(x, &n)| {
            let x0 = x.clone().floor();
            let w1 = x - x0.clone();
            let w0 = w1.clone().mul_scalar(-1.0).add_scalar(1.0);
            let x1 = x0.clone() + 1.0;

            // Clamp indices to valid range
            let i0 = x0.clamp(0.0, (n - 1) as f64).int();
            let i1 = x1.clamp(0.0, (n - 1) as f64).int();
            (i0, i1, w0, w1)
        })
        .collect();

    let ndim = axes.len();
    (0..1usize << ndim)
        .map(|corner| {
            let pick = |axis: usize| {
                let (i0, i1, w0, w1) = &axes[axis];
                let (i, w) = if corner & (1 << axis) != 0 { (i1, w1) } else { (i0, w0) };
                (i.clone() * strides[axis] as i32, w.clone())
            };
            let (mut offset, mut weight) = pick(0);
            for axis in 1..ndim {
                let (o, w) = pick(axis);
                offset = offset + o;
                weight = weight * w;
            }
            (offset, weight)
        })
        .collect()
}
