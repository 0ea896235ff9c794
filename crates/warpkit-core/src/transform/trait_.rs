//! Transform trait for spatial coordinate transformations.
//!
//! This module defines the core Transform trait that all spatial transforms must implement.

use std::fmt::Debug;
use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::affine::AffineTransform;
use crate::error::{Result, TransformError};
use crate::space::CoordinateSpace;

/// A transform shared between chains and resamplers.
pub type SharedTransform<B> = Arc<dyn Transform<B>>;

/// Transform trait for spatial coordinate transformations.
///
/// Maps world points from the moving space (domain) to the reference space
/// (codomain). Every variant is immutable after construction, so one
/// instance may be evaluated from many threads at once.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Transform<B: Backend>: Send + Sync + Debug {
    /// Number of spatial dimensions the transform acts on.
    fn ndim(&self) -> usize;

    /// Apply transform to a batch of points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, ndim]` containing world points
    ///
    /// # Returns
    /// Tensor of shape `[Batch, ndim]`, same order as the input
    ///
    /// # Errors
    /// `SpaceMismatch` when the column count differs from `ndim()`.
    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>>;

    /// Get the inverse transform.
    ///
    /// # Errors
    /// `NotInvertible` when no well-defined inverse exists.
    fn inverse(&self) -> Result<SharedTransform<B>>;

    /// Space of the transform's outputs, when known.
    fn reference(&self) -> Option<&Arc<CoordinateSpace>> {
        None
    }

    /// Space of the transform's inputs, when known.
    fn moving(&self) -> Option<&Arc<CoordinateSpace>> {
        None
    }

    /// Closed form of the transform when it is a single affine map.
    fn as_affine(&self) -> Option<AffineTransform> {
        None
    }
}

/// Check that a point batch has `ndim` columns.
pub(crate) fn check_points<B: Backend>(points: &Tensor<B, 2>, ndim: usize) -> Result<()> {
    let cols = points.dims()[1];
    if cols != ndim {
        return Err(TransformError::ndim_mismatch("points", ndim, cols));
    }
    Ok(())
}
