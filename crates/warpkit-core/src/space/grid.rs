use std::ops::Range;

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate the continuous indices of every node of a grid.
///
/// Returns a tensor of shape `[N, D]` where N is the total number of nodes
/// and D is the number of axes. Rows follow row-major order (last axis
/// fastest), column `c` holds the index along axis `c`.
///
/// # Arguments
/// * `shape` - The grid shape `[D0, D1, ...]`
/// * `device` - The device to create the tensor on
pub fn generate_grid<B: Backend>(shape: &[usize], device: &B::Device) -> Tensor<B, 2> {
    let total = shape.iter().product();
    generate_grid_range(shape, 0..total, device)
}

/// Generate the continuous indices for a contiguous range of flat node offsets.
///
/// Used to split a large output grid into independent chunks.
///
/// # Arguments
/// * `shape` - The grid shape `[D0, D1, ...]`
/// * `range` - Flat (row-major) offsets to generate
/// * `device` - The device to create the tensor on
///
/// # Returns
/// Tensor of shape `[range.len(), D]` containing continuous indices
pub fn generate_grid_range<B: Backend>(
    shape: &[usize],
    range: Range<usize>,
    device: &B::Device,
) -> Tensor<B, 2> {
    let ndim = shape.len();
    let count = range.len();

    let mut grid = Vec::with_capacity(count * ndim);
    let mut multi = vec![0usize; ndim];
    for offset in range {
        let mut rem = offset;
        for axis in (0..ndim).rev() {
            multi[axis] = rem % shape[axis];
            rem /= shape[axis];
        }
        grid.extend(multi.iter().map(|&i| i as f32));
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([count * ndim])), device)
        .reshape([count, ndim])
}

/// Row-major strides for a grid shape.
pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}
