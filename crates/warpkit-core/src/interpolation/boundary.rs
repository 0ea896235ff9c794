//! Column helpers and grid-extent checks for batched indices.

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, ElementConversion, Tensor};

/// Distance (in index units) within which an index snaps to the nearest node.
///
/// Keeps evaluation at stored nodes exact despite rounding in the
/// world-to-index conversion.
pub const GRID_SNAP_TOLERANCE: f64 = 1e-4;

/// Slack (in index units) allowed past the first and last node before a
/// point counts as outside the grid.
pub const BOUNDS_TOLERANCE: f64 = 1e-3;

/// Split `[Batch, D]` indices into `D` column tensors of shape `[Batch]`.
pub fn columns<B: Backend>(indices: Tensor<B, 2>) -> Vec<Tensor<B, 1>> {
    let ndim = indices.dims()[1];
    (0..ndim)
        .map(|axis| indices.clone().narrow(1, axis, 1).squeeze::<1>(1))
        .collect()
}

/// Reassemble column tensors into `[Batch, D]`.
pub fn stack_columns<B: Backend>(columns: Vec<Tensor<B, 1>>) -> Tensor<B, 2> {
    let columns = columns.into_iter().map(|c| c.unsqueeze_dim::<2>(1)).collect();
    Tensor::cat(columns, 1)
}

/// Replace indices within `tolerance` of an integer by that integer.
pub fn snap_to_grid<B: Backend>(indices: Tensor<B, 2>, tolerance: f64) -> Tensor<B, 2> {
    let rounded = indices.clone().round();
    let near = (indices.clone() - rounded.clone()).abs().lower_elem(tolerance);
    indices.mask_where(near, rounded)
}

/// Clamp every column to `[0, n - 1]` of its axis.
pub fn clamp_to_grid<B: Backend>(indices: Tensor<B, 2>, shape: &[usize]) -> Tensor<B, 2> {
    let clamped = columns(indices)
        .into_iter()
        .zip(shape)
        .map(|(c, &n)| c.clamp(0.0, (n - 1) as f64))
        .collect();
    stack_columns(clamped)
}

/// Mask of rows lying outside the grid extent on any axis.
///
/// Non-finite indices count as outside.
///
/// # Returns
/// Boolean tensor `[Batch]`, true where the point is outside
pub fn outside_mask<B: Backend>(indices: Tensor<B, 2>, shape: &[usize]) -> Tensor<B, 1, Bool> {
    let [batch, _] = indices.dims();
    let mut hits = Tensor::<B, 1>::zeros([batch], &indices.device());
    for (c, &n) in columns(indices).into_iter().zip(shape) {
        let below = c.clone().lower_elem(-BOUNDS_TOLERANCE).float();
        let above = c.clone().greater_elem((n - 1) as f64 + BOUNDS_TOLERANCE).float();
        let nan = c.is_nan().float();
        hits = hits + below + above + nan;
    }
    hits.greater_elem(0.5)
}

/// Number of true entries in a mask.
pub fn count_true<B: Backend>(mask: Tensor<B, 1, Bool>) -> usize {
    mask.float().sum().into_scalar().elem::<f64>().round() as usize
}
