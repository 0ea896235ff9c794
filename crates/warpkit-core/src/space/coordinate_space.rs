//! Coordinate space descriptor.
//!
//! A `CoordinateSpace` pairs a sampling grid shape with the homogeneous affine
//! that maps discrete grid indices to continuous world coordinates.

use std::ops::Range;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::{DMatrix, Matrix4};
use serde::{Deserialize, Serialize};

use super::grid::generate_grid_range;
use super::homogeneous::{apply_homogeneous, apply_homogeneous_point, invert_homogeneous, validate_homogeneous};
use crate::error::{Result, TransformError};

/// Immutable descriptor of a sampling grid.
///
/// # Coordinate Systems
/// * **Index Space**: continuous grid indices, column `c` addresses axis `c`
/// * **World Space**: continuous physical coordinates (mm)
///
/// The mapping is `world = A * index + t` where `[A t; 0 1]` is the affine.
/// The world-to-index inverse is computed once at construction.
///
/// # Examples
/// ```rust
/// use warpkit_core::space::CoordinateSpace;
///
/// let space = CoordinateSpace::identity(vec![10, 10, 10]).unwrap();
/// let world = space.index_to_world(&[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(world, vec![1.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinateSpace", into = "RawCoordinateSpace")]
pub struct CoordinateSpace {
    shape: Vec<usize>,
    affine: DMatrix<f64>,
    inverse: DMatrix<f64>,
}

/// Wire form of a coordinate space; validated when decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCoordinateSpace {
    shape: Vec<usize>,
    affine: DMatrix<f64>,
}

impl TryFrom<RawCoordinateSpace> for CoordinateSpace {
    type Error = TransformError;

    fn try_from(raw: RawCoordinateSpace) -> Result<Self> {
        Self::new(raw.shape, raw.affine)
    }
}

impl From<CoordinateSpace> for RawCoordinateSpace {
    fn from(space: CoordinateSpace) -> Self {
        Self {
            shape: space.shape,
            affine: space.affine,
        }
    }
}

impl CoordinateSpace {
    /// Create a coordinate space.
    ///
    /// # Arguments
    /// * `shape` - Grid size along each axis; every entry must be positive
    /// * `affine` - `(ndim+1) x (ndim+1)` homogeneous index-to-world matrix
    ///
    /// # Errors
    /// `InvalidParameter` for an empty or zero-sized shape, a non-homogeneous
    /// or singular affine, or an affine whose size does not match the shape.
    pub fn new(shape: Vec<usize>, affine: DMatrix<f64>) -> Result<Self> {
        if shape.is_empty() || shape.iter().any(|&s| s == 0) {
            return Err(TransformError::invalid_parameter(format!(
                "grid shape must be non-empty with positive sizes, got {:?}",
                shape
            )));
        }

        let ndim = validate_homogeneous(&affine)?;
        if ndim != shape.len() {
            return Err(TransformError::invalid_parameter(format!(
                "affine is {}x{} but the grid has {} axes",
                ndim + 1,
                ndim + 1,
                shape.len()
            )));
        }

        let inverse = invert_homogeneous(&affine).map_err(|e| {
            TransformError::invalid_parameter(format!("coordinate space affine is singular ({})", e))
        })?;

        Ok(Self { shape, affine, inverse })
    }

    /// Create a 3D coordinate space from a 4x4 affine.
    pub fn from_matrix4(shape: [usize; 3], affine: Matrix4<f64>) -> Result<Self> {
        let affine = DMatrix::from_iterator(4, 4, affine.iter().copied());
        Self::new(shape.to_vec(), affine)
    }

    /// Create a space whose world coordinates equal its grid indices.
    pub fn identity(shape: Vec<usize>) -> Result<Self> {
        let n = shape.len();
        Self::new(shape, DMatrix::identity(n + 1, n + 1))
    }

    /// Create a space from origin, spacing and direction.
    ///
    /// `world = origin + direction * (index * spacing)`
    ///
    /// # Arguments
    /// * `shape` - Grid size along each axis
    /// * `origin` - World coordinate of index `(0, 0, ...)`
    /// * `spacing` - Physical distance between nodes along each axis
    /// * `direction` - `ndim x ndim` orientation matrix
    pub fn from_geometry(
        shape: Vec<usize>,
        origin: &[f64],
        spacing: &[f64],
        direction: &DMatrix<f64>,
    ) -> Result<Self> {
        let n = shape.len();
        if origin.len() != n || spacing.len() != n || direction.shape() != (n, n) {
            return Err(TransformError::invalid_parameter(format!(
                "geometry for {} axes needs origin[{}], spacing[{}] and a {}x{} direction",
                n, n, n, n, n
            )));
        }

        let mut affine = DMatrix::<f64>::identity(n + 1, n + 1);
        for r in 0..n {
            for c in 0..n {
                affine[(r, c)] = direction[(r, c)] * spacing[c];
            }
            affine[(r, n)] = origin[r];
        }
        Self::new(shape, affine)
    }

    /// Grid size along each axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of spatial axes.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of grid nodes.
    pub fn num_voxels(&self) -> usize {
        self.shape.iter().product()
    }

    /// Index-to-world homogeneous matrix.
    pub fn affine(&self) -> &DMatrix<f64> {
        &self.affine
    }

    /// World-to-index homogeneous matrix.
    pub fn inverse_affine(&self) -> &DMatrix<f64> {
        &self.inverse
    }

    /// World coordinate of index `(0, 0, ...)`.
    pub fn origin(&self) -> Vec<f64> {
        let n = self.ndim();
        (0..n).map(|r| self.affine[(r, n)]).collect()
    }

    /// Node spacing along each axis (column norms of the linear block).
    pub fn spacing(&self) -> Vec<f64> {
        let n = self.ndim();
        (0..n)
            .map(|c| (0..n).map(|r| self.affine[(r, c)].powi(2)).sum::<f64>().sqrt())
            .collect()
    }

    /// Whether two spaces describe the same grid within `tolerance`.
    pub fn same_grid(&self, other: &CoordinateSpace, tolerance: f64) -> bool {
        self.shape == other.shape
            && self
                .affine
                .iter()
                .zip(other.affine.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Convert a continuous index to a world point.
    pub fn index_to_world(&self, index: &[f64]) -> Result<Vec<f64>> {
        self.check_len(index.len())?;
        Ok(apply_homogeneous_point(&self.affine, index))
    }

    /// Convert a world point to a continuous index.
    pub fn world_to_index(&self, point: &[f64]) -> Result<Vec<f64>> {
        self.check_len(point.len())?;
        Ok(apply_homogeneous_point(&self.inverse, point))
    }

    /// Batch convert continuous indices `[Batch, D]` to world points.
    pub fn index_to_world_tensor<B: Backend>(&self, indices: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        self.check_len(indices.dims()[1])?;
        Ok(apply_homogeneous(&self.affine, indices))
    }

    /// Batch convert world points `[Batch, D]` to continuous indices.
    pub fn world_to_index_tensor<B: Backend>(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        self.check_len(points.dims()[1])?;
        Ok(apply_homogeneous(&self.inverse, points))
    }

    /// Continuous indices for a contiguous range of flat node offsets.
    pub fn grid_indices<B: Backend>(&self, range: Range<usize>, device: &B::Device) -> Tensor<B, 2> {
        generate_grid_range(&self.shape, range, device)
    }

    /// World coordinates for a contiguous range of flat node offsets.
    pub fn grid_world<B: Backend>(&self, range: Range<usize>, device: &B::Device) -> Tensor<B, 2> {
        apply_homogeneous(&self.affine, self.grid_indices(range, device))
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.ndim() {
            return Err(TransformError::ndim_mismatch("coordinate space", self.ndim(), len));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn oblique() -> CoordinateSpace {
        // 90 degree rotation about z, spacing (2, 1, 3), origin (10, 20, 30)
        let direction = DMatrix::from_row_slice(3, 3, &[0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        CoordinateSpace::from_geometry(vec![4, 5, 6], &[10.0, 20.0, 30.0], &[2.0, 1.0, 3.0], &direction).unwrap()
    }

    #[test]
    fn test_space_creation() {
        let space = CoordinateSpace::identity(vec![10, 10, 10]).unwrap();
        assert_eq!(space.shape(), &[10, 10, 10]);
        assert_eq!(space.ndim(), 3);
        assert_eq!(space.num_voxels(), 1000);
        assert_eq!(space.origin(), vec![0.0, 0.0, 0.0]);
        assert_eq!(space.spacing(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_invalid_shape() {
        assert!(matches!(
            CoordinateSpace::identity(vec![10, 0, 10]),
            Err(TransformError::InvalidParameter(_))
        ));
        assert!(CoordinateSpace::identity(vec![]).is_err());
    }

    #[test]
    fn test_singular_affine_rejected() {
        let mut affine = DMatrix::<f64>::identity(4, 4);
        affine[(1, 1)] = 0.0;
        assert!(matches!(
            CoordinateSpace::new(vec![2, 2, 2], affine),
            Err(TransformError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_affine_size_must_match_shape() {
        assert!(CoordinateSpace::new(vec![2, 2], DMatrix::identity(4, 4)).is_err());
    }

    #[test]
    fn test_geometry_mapping() {
        let space = oblique();
        assert_eq!(space.origin(), vec![10.0, 20.0, 30.0]);
        assert_eq!(space.spacing(), vec![2.0, 1.0, 3.0]);

        // index (1, 0, 0) -> origin + R * (2, 0, 0) = origin + (0, 2, 0)
        let world = space.index_to_world(&[1.0, 0.0, 0.0]).unwrap();
        assert!((world[0] - 10.0).abs() < 1e-12);
        assert!((world[1] - 22.0).abs() < 1e-12);
        assert!((world[2] - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_index_world_roundtrip() {
        let space = oblique();
        let index = [1.5, 2.25, 3.75];
        let world = space.index_to_world(&index).unwrap();
        let back = space.world_to_index(&world).unwrap();
        for i in 0..3 {
            assert!((back[i] - index[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_tensor_conversion_matches_host() {
        let device = Default::default();
        let space = oblique();
        let world = space.grid_world::<TestBackend>(0..space.num_voxels(), &device);
        let indices = space.world_to_index_tensor(world).unwrap();
        let expected = space.grid_indices::<TestBackend>(0..space.num_voxels(), &device);

        let a = indices.into_data();
        let b = expected.into_data();
        for (x, y) in a.as_slice::<f32>().unwrap().iter().zip(b.as_slice::<f32>().unwrap()) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_wrong_point_length() {
        let space = oblique();
        assert!(matches!(
            space.index_to_world(&[1.0, 2.0]),
            Err(TransformError::SpaceMismatch(_))
        ));
    }

    #[test]
    fn test_same_grid() {
        let space = oblique();
        assert!(space.same_grid(&oblique(), 1e-9));

        let mut nudged = space.affine().clone();
        nudged[(0, 3)] += 1e-3;
        let moved = CoordinateSpace::new(vec![4, 5, 6], nudged).unwrap();
        assert!(!space.same_grid(&moved, 1e-6));
        assert!(space.same_grid(&moved, 1e-2));

        let resized = CoordinateSpace::new(vec![4, 5, 7], space.affine().clone()).unwrap();
        assert!(!space.same_grid(&resized, 1.0));
    }

    #[test]
    fn test_serde_roundtrip_and_validation() {
        let space = oblique();
        let json = serde_json::to_string(&space).unwrap();
        let decoded: CoordinateSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, space);

        let mut raw: serde_json::Value = serde_json::to_value(&space).unwrap();
        raw["shape"] = serde_json::json!([4, 0, 6]);
        assert!(serde_json::from_value::<CoordinateSpace>(raw).is_err());
    }
}
