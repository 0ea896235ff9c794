//! Series of affine transforms indexed by volume.
//!
//! Used for time series (e.g. head-motion correction), where volume `t` of a
//! 4D acquisition has its own affine into the reference space.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::DMatrix;

use super::affine::AffineTransform;
use super::trait_::{check_points, Transform};
use crate::error::{Result, TransformError};
use crate::space::CoordinateSpace;

/// Ordered, non-empty list of affine transforms sharing one dimensionality.
#[derive(Debug, Clone)]
pub struct LinearTransformsMapping {
    transforms: Vec<AffineTransform>,
    ndim: usize,
}

impl LinearTransformsMapping {
    /// Create a mapping from homogeneous matrices.
    ///
    /// # Errors
    /// Any error from [`AffineTransform::new`], `InvalidParameter` when empty,
    /// `SpaceMismatch` when the matrices differ in size.
    pub fn new(matrices: Vec<DMatrix<f64>>) -> Result<Self> {
        let transforms = matrices
            .into_iter()
            .map(AffineTransform::new)
            .collect::<Result<Vec<_>>>()?;
        Self::from_transforms(transforms)
    }

    /// Create a mapping from existing affines.
    pub fn from_transforms(transforms: Vec<AffineTransform>) -> Result<Self> {
        let ndim = match transforms.first() {
            Some(first) => first.ndim(),
            None => {
                return Err(TransformError::invalid_parameter(
                    "a linear transforms mapping needs at least one affine",
                ))
            }
        };
        for (i, t) in transforms.iter().enumerate().skip(1) {
            if t.ndim() != ndim {
                return Err(TransformError::ndim_mismatch(&format!("affine #{}", i), ndim, t.ndim()));
            }
        }
        Ok(Self { transforms, ndim })
    }

    /// Number of affines.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether the mapping holds no affines; never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Number of spatial dimensions.
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Get the affine of volume `index`.
    pub fn get(&self, index: usize) -> Result<&AffineTransform> {
        self.transforms.get(index).ok_or(TransformError::IndexOutOfRange {
            index,
            len: self.transforms.len(),
        })
    }

    /// Iterate over the affines in volume order.
    pub fn iter(&self) -> std::slice::Iter<'_, AffineTransform> {
        self.transforms.iter()
    }

    /// Map points through the affine of volume `index`.
    pub fn transform_points<B: Backend>(&self, points: Tensor<B, 2>, index: usize) -> Result<Tensor<B, 2>> {
        Transform::<B>::transform_points(self.get(index)?, points)
    }

    /// Map the same points through every affine.
    ///
    /// # Returns
    /// Tensor of shape `[T, N, ndim]`, entry `t` mapped by affine `t`
    pub fn map_all<B: Backend>(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 3>> {
        check_points(&points, self.ndim)?;
        let mapped = self
            .transforms
            .iter()
            .map(|t| Transform::<B>::transform_points(t, points.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::stack(mapped, 0))
    }

    /// Invert every affine, keeping the volume order.
    pub fn inverse(&self) -> Result<Self> {
        let transforms = self
            .transforms
            .iter()
            .map(AffineTransform::inverse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { transforms, ndim: self.ndim })
    }

    /// Attach a reference space to every affine.
    pub fn with_reference(self, space: Arc<CoordinateSpace>) -> Result<Self> {
        let transforms = self
            .transforms
            .into_iter()
            .map(|t| t.with_reference(space.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { transforms, ndim: self.ndim })
    }

    /// Attach a moving space to every affine.
    pub fn with_moving(self, space: Arc<CoordinateSpace>) -> Result<Self> {
        let transforms = self
            .transforms
            .into_iter()
            .map(|t| t.with_moving(space.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { transforms, ndim: self.ndim })
    }
}

impl<'a> IntoIterator for &'a LinearTransformsMapping {
    type Item = &'a AffineTransform;
    type IntoIter = std::slice::Iter<'a, AffineTransform>;

    fn into_iter(self) -> Self::IntoIter {
        self.transforms.iter()
    }
}
