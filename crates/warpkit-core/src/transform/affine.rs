//! Affine transform implementation.
//!
//! This module provides an affine transform (linear transformation + translation)
//! stored as a homogeneous matrix.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::{DMatrix, Matrix4};

use super::trait_::{check_points, SharedTransform, Transform};
use crate::error::{Result, TransformError};
use crate::space::homogeneous::{
    apply_homogeneous, apply_homogeneous_point, invert_homogeneous, linear_determinant, validate_homogeneous,
};
use crate::space::{CoordinateSpace, SINGULAR_TOLERANCE};

/// Element-wise tolerance used by [`AffineTransform::approx_eq`].
pub const EQUALITY_TOLERANCE: f64 = 1e-5;

/// Affine Transform (Linear transformation + Translation).
///
/// Represents `T(x) = A x + t` as the homogeneous matrix `[A t; 0 1]`,
/// mapping points of the moving space (domain) into the reference space
/// (codomain).
///
/// A singular linear block is rejected at construction unless the transform
/// is explicitly built with [`AffineTransform::non_invertible`].
#[derive(Debug, Clone)]
pub struct AffineTransform {
    matrix: DMatrix<f64>,
    ndim: usize,
    invertible: bool,
    reference: Option<Arc<CoordinateSpace>>,
    moving: Option<Arc<CoordinateSpace>>,
}

impl AffineTransform {
    /// Create a new affine transform.
    ///
    /// # Arguments
    /// * `matrix` - `(ndim+1) x (ndim+1)` homogeneous matrix
    ///
    /// # Errors
    /// `InvalidParameter` for a non-homogeneous matrix, `NotInvertible` when
    /// the linear block is singular.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self> {
        let ndim = validate_homogeneous(&matrix)?;
        let det = linear_determinant(&matrix);
        if det.abs() < SINGULAR_TOLERANCE {
            return Err(TransformError::not_invertible(format!(
                "linear block determinant {:e} is singular; use AffineTransform::non_invertible for projections",
                det
            )));
        }
        Ok(Self {
            matrix,
            ndim,
            invertible: true,
            reference: None,
            moving: None,
        })
    }

    /// Create an affine transform explicitly flagged as non-invertible.
    ///
    /// The linear block may be singular; `inverse` always fails.
    pub fn non_invertible(matrix: DMatrix<f64>) -> Result<Self> {
        let ndim = validate_homogeneous(&matrix)?;
        Ok(Self {
            matrix,
            ndim,
            invertible: false,
            reference: None,
            moving: None,
        })
    }

    /// Create a 3D affine transform from a 4x4 matrix.
    pub fn from_matrix4(matrix: Matrix4<f64>) -> Result<Self> {
        Self::new(DMatrix::from_iterator(4, 4, matrix.iter().copied()))
    }

    /// Create an identity transform.
    pub fn identity(ndim: usize) -> Result<Self> {
        Self::new(DMatrix::identity(ndim + 1, ndim + 1))
    }

    /// Create a pure translation.
    pub fn from_translation(offset: &[f64]) -> Result<Self> {
        let n = offset.len();
        let mut matrix = DMatrix::identity(n + 1, n + 1);
        for (i, v) in offset.iter().enumerate() {
            matrix[(i, n)] = *v;
        }
        Self::new(matrix)
    }

    /// Attach the reference (output) space.
    pub fn with_reference(mut self, space: Arc<CoordinateSpace>) -> Result<Self> {
        if space.ndim() != self.ndim {
            return Err(TransformError::ndim_mismatch("reference space", self.ndim, space.ndim()));
        }
        self.reference = Some(space);
        Ok(self)
    }

    /// Attach the moving (input) space.
    pub fn with_moving(mut self, space: Arc<CoordinateSpace>) -> Result<Self> {
        if space.ndim() != self.ndim {
            return Err(TransformError::ndim_mismatch("moving space", self.ndim, space.ndim()));
        }
        self.moving = Some(space);
        Ok(self)
    }

    /// Get the homogeneous matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Get the `ndim x ndim` linear block.
    pub fn linear(&self) -> DMatrix<f64> {
        self.matrix.view((0, 0), (self.ndim, self.ndim)).clone_owned()
    }

    /// Get the translation vector.
    pub fn translation(&self) -> Vec<f64> {
        (0..self.ndim).map(|r| self.matrix[(r, self.ndim)]).collect()
    }

    /// Determinant of the linear block.
    pub fn determinant(&self) -> f64 {
        linear_determinant(&self.matrix)
    }

    /// Whether `inverse` can succeed.
    pub fn is_invertible(&self) -> bool {
        self.invertible
    }

    /// Number of spatial dimensions.
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Compose two affines: the result applies `other` first, then `self`.
    ///
    /// `a.compose(&b).map(p) == a.map(b.map(p))`, i.e. the matrix product
    /// `a * b`. The result maps `other`'s moving space into `self`'s
    /// reference space.
    ///
    /// # Errors
    /// `SpaceMismatch` when the dimensionalities differ, or when `other`'s
    /// reference space and `self`'s moving space are both known and disagree
    /// on dimensionality.
    pub fn compose(&self, other: &AffineTransform) -> Result<AffineTransform> {
        if self.ndim != other.ndim {
            return Err(TransformError::ndim_mismatch("affine composition", self.ndim, other.ndim));
        }
        if let (Some(inner_out), Some(outer_in)) = (&other.reference, &self.moving) {
            if inner_out.ndim() != outer_in.ndim() {
                return Err(TransformError::ndim_mismatch(
                    "affine composition spaces",
                    outer_in.ndim(),
                    inner_out.ndim(),
                ));
            }
        }

        let matrix = &self.matrix * &other.matrix;
        let invertible =
            self.invertible && other.invertible && linear_determinant(&matrix).abs() >= SINGULAR_TOLERANCE;
        Ok(Self {
            matrix,
            ndim: self.ndim,
            invertible,
            reference: self.reference.clone(),
            moving: other.moving.clone(),
        })
    }

    /// Get the inverse transform, with reference and moving spaces swapped.
    ///
    /// # Errors
    /// `NotInvertible` if the transform was flagged non-invertible or its
    /// determinant is below [`SINGULAR_TOLERANCE`].
    pub fn inverse(&self) -> Result<AffineTransform> {
        if !self.invertible {
            return Err(TransformError::not_invertible("affine transform is flagged non-invertible"));
        }
        let matrix = invert_homogeneous(&self.matrix)?;
        Ok(Self {
            matrix,
            ndim: self.ndim,
            invertible: true,
            reference: self.moving.clone(),
            moving: self.reference.clone(),
        })
    }

    /// Map a single point on the host.
    pub fn map_point(&self, point: &[f64]) -> Result<Vec<f64>> {
        if point.len() != self.ndim {
            return Err(TransformError::ndim_mismatch("point", self.ndim, point.len()));
        }
        Ok(apply_homogeneous_point(&self.matrix, point))
    }

    /// Element-wise matrix comparison within [`EQUALITY_TOLERANCE`].
    pub fn approx_eq(&self, other: &AffineTransform) -> bool {
        self.ndim == other.ndim
            && self
                .matrix
                .iter()
                .zip(other.matrix.iter())
                .all(|(a, b)| (a - b).abs() <= EQUALITY_TOLERANCE)
    }
}

impl<B: Backend> Transform<B> for AffineTransform {
    fn ndim(&self) -> usize {
        self.ndim
    }

    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        check_points(&points, self.ndim)?;
        Ok(apply_homogeneous(&self.matrix, points))
    }

    fn inverse(&self) -> Result<SharedTransform<B>> {
        let inverse = AffineTransform::inverse(self)?;
        Ok(Arc::new(inverse))
    }

    fn reference(&self) -> Option<&Arc<CoordinateSpace>> {
        self.reference.as_ref()
    }

    fn moving(&self) -> Option<&Arc<CoordinateSpace>> {
        self.moving.as_ref()
    }

    fn as_affine(&self) -> Option<AffineTransform> {
        Some(self.clone())
    }
}
