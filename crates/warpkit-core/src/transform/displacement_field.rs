//! Displacement field transform implementation.
//!
//! This module provides a dense displacement field transform where each
//! grid node has its own displacement vector. This is used for deformable
//! (non-rigid) registration results.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::trait_::{check_points, SharedTransform, Transform};
use crate::error::{Result, TransformError};
use crate::interpolation::boundary::{clamp_to_grid, count_true, outside_mask, snap_to_grid, GRID_SNAP_TOLERANCE};
use crate::interpolation::LinearInterpolator;
use crate::space::CoordinateSpace;

/// Behaviour of a displacement field at points outside its grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldBoundary {
    /// Use the displacement of the nearest edge node.
    #[default]
    Clamp,
    /// Treat the displacement as zero outside the grid.
    Zero,
    /// Fail with `OutOfBounds`.
    Error,
}

/// Dense displacement field transform.
///
/// Maps `x -> x + d(x)`, where `d` is sampled on the nodes of a coordinate
/// space and evaluated between nodes by multilinear interpolation. At a
/// stored node the stored vector is returned unchanged.
///
/// # Type Parameters
/// * `B` - The Burn backend
#[derive(Debug, Clone)]
pub struct DisplacementFieldTransform<B: Backend> {
    space: Arc<CoordinateSpace>,
    /// Displacement rows `[n_nodes, ndim]` in row-major node order
    rows: Tensor<B, 2>,
    boundary: FieldBoundary,
    inverse: Option<Box<DisplacementFieldTransform<B>>>,
}

impl<B: Backend> DisplacementFieldTransform<B> {
    /// Create a displacement field transform.
    ///
    /// # Arguments
    /// * `field` - Tensor of shape `space.shape() ++ [ndim]` holding world-space displacements
    /// * `space` - Grid on which the field is sampled
    ///
    /// # Errors
    /// `InvalidParameter` when the field shape does not match the grid or a
    /// value is NaN or infinite.
    pub fn new<const K: usize>(field: Tensor<B, K>, space: Arc<CoordinateSpace>) -> Result<Self> {
        let rows = field_rows(field, &space)?;
        Ok(Self {
            space,
            rows,
            boundary: FieldBoundary::default(),
            inverse: None,
        })
    }

    /// Create an all-zero field (the identity map) on a grid.
    pub fn zeros(space: Arc<CoordinateSpace>, device: &B::Device) -> Self {
        let rows = Tensor::zeros([space.num_voxels(), space.ndim()], device);
        Self {
            space,
            rows,
            boundary: FieldBoundary::default(),
            inverse: None,
        }
    }

    /// Create a transform from a deformation field of absolute target positions.
    ///
    /// Each node's own world coordinate is subtracted to obtain displacements.
    pub fn from_deformation<const K: usize>(field: Tensor<B, K>, space: Arc<CoordinateSpace>) -> Result<Self> {
        let positions = field_rows(field, &space)?;
        let nodes = space.grid_world::<B>(0..space.num_voxels(), &positions.device());
        Ok(Self {
            rows: positions - nodes,
            space,
            boundary: FieldBoundary::default(),
            inverse: None,
        })
    }

    /// Set the out-of-grid policy.
    pub fn with_boundary(mut self, boundary: FieldBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Attach a precomputed inverse field.
    ///
    /// # Errors
    /// `SpaceMismatch` when the inverse acts on a different number of axes.
    pub fn with_inverse(mut self, inverse: DisplacementFieldTransform<B>) -> Result<Self> {
        if inverse.space.ndim() != self.space.ndim() {
            return Err(TransformError::ndim_mismatch(
                "inverse displacement field",
                self.space.ndim(),
                inverse.space.ndim(),
            ));
        }
        self.inverse = Some(Box::new(inverse.without_inverse()));
        Ok(self)
    }

    /// Grid on which the field is sampled.
    pub fn space(&self) -> &Arc<CoordinateSpace> {
        &self.space
    }

    /// Displacement rows `[n_nodes, ndim]`.
    pub fn rows(&self) -> &Tensor<B, 2> {
        &self.rows
    }

    /// Out-of-grid policy.
    pub fn boundary(&self) -> FieldBoundary {
        self.boundary
    }

    /// Whether a precomputed inverse is attached.
    pub fn has_inverse(&self) -> bool {
        self.inverse.is_some()
    }

    /// Evaluate the displacement at world points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, ndim]`
    ///
    /// # Returns
    /// Displacements of shape `[Batch, ndim]`
    pub fn displacements(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let ndim = self.space.ndim();
        check_points(&points, ndim)?;
        let [batch, _] = points.dims();
        let shape = self.space.shape();

        let indices = snap_to_grid(self.space.world_to_index_tensor(points)?, GRID_SNAP_TOLERANCE);
        let outside = outside_mask(indices.clone(), shape);
        let n_outside = count_true(outside.clone());

        if n_outside > 0 {
            match self.boundary {
                FieldBoundary::Error => {
                    return Err(TransformError::out_of_bounds(format!(
                        "{} of {} points fall outside the displacement field grid {:?}",
                        n_outside, batch, shape
                    )));
                }
                FieldBoundary::Clamp => {
                    tracing::warn!(
                        "Clamping {} of {} points to the displacement field edge",
                        n_outside,
                        batch
                    );
                }
                FieldBoundary::Zero => {}
            }
        }

        let indices = clamp_to_grid(indices, shape);
        let displacement = LinearInterpolator::new().interpolate_rows(&self.rows, shape, indices);

        if n_outside > 0 && self.boundary == FieldBoundary::Zero {
            let inside = outside.bool_not().float().reshape([batch, 1]);
            return Ok(displacement * inside);
        }
        Ok(displacement)
    }

    fn without_inverse(mut self) -> Self {
        self.inverse = None;
        self
    }
}

/// Check a `grid ++ [ndim]` field against its space and flatten it to rows.
///
/// Values must be finite.
fn field_rows<B: Backend, const K: usize>(field: Tensor<B, K>, space: &CoordinateSpace) -> Result<Tensor<B, 2>> {
    let ndim = space.ndim();
    let mut expected = space.shape().to_vec();
    expected.push(ndim);

    let actual = field.dims().to_vec();
    if actual != expected {
        return Err(TransformError::invalid_parameter(format!(
            "displacement field must have shape {:?} (grid ++ [ndim]), got {:?}",
            expected, actual
        )));
    }

    let flat = field.reshape([space.num_voxels() * ndim]);
    // x - x is NaN exactly when x is NaN or infinite
    let non_finite = count_true((flat.clone() - flat.clone()).is_nan());
    if non_finite > 0 {
        return Err(TransformError::invalid_parameter(format!(
            "displacement field holds {} non-finite values",
            non_finite
        )));
    }
    Ok(flat.reshape([space.num_voxels(), ndim]))
}

impl<B: Backend> Transform<B> for DisplacementFieldTransform<B> {
    fn ndim(&self) -> usize {
        self.space.ndim()
    }

    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let displacement = self.displacements(points.clone())?;
        Ok(points + displacement)
    }

    fn inverse(&self) -> Result<SharedTransform<B>> {
        match &self.inverse {
            Some(inverse) => {
                let forward = self.clone().without_inverse();
                let mut inverse = inverse.as_ref().clone();
                inverse.inverse = Some(Box::new(forward));
                Ok(Arc::new(inverse))
            }
            None => Err(TransformError::not_invertible(
                "displacement field has no precomputed inverse",
            )),
        }
    }

    fn reference(&self) -> Option<&Arc<CoordinateSpace>> {
        Some(&self.space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;
    use nalgebra::DMatrix;

    type TestBackend = NdArray<f32>;

    /// 2D grid [2, 3] whose node (i, j) is displaced by (i, 10 * j).
    fn ramp_field() -> DisplacementFieldTransform<TestBackend> {
        ramp_field_on(Arc::new(CoordinateSpace::identity(vec![2, 3]).unwrap()))
    }

    fn ramp_field_on(space: Arc<CoordinateSpace>) -> DisplacementFieldTransform<TestBackend> {
        let device = Default::default();
        let mut values = Vec::new();
        for i in 0..2 {
            for j in 0..3 {
                values.push(i as f32);
                values.push(10.0 * j as f32);
            }
        }
        let field = Tensor::<TestBackend, 3>::from_data(TensorData::new(values, Shape::new([2, 3, 2])), &device);
        DisplacementFieldTransform::new(field, space).unwrap()
    }

    #[test]
    fn test_displacement_field_creation() {
        let device = Default::default();
        let space = Arc::new(CoordinateSpace::identity(vec![4, 5, 6]).unwrap());
        let transform = DisplacementFieldTransform::<TestBackend>::zeros(space, &device);

        assert_eq!(transform.rows().dims(), [120, 3]);
        assert_eq!(Transform::<TestBackend>::ndim(&transform), 3);
        assert_eq!(transform.boundary(), FieldBoundary::Clamp);
    }

    #[test]
    fn test_zero_field_is_identity() {
        let device = Default::default();
        let space = Arc::new(CoordinateSpace::identity(vec![4, 4]).unwrap());
        let transform = DisplacementFieldTransform::<TestBackend>::zeros(space, &device);

        let points = Tensor::<TestBackend, 2>::from_floats([[1.5, 2.25], [0.0, 3.0]], &device);
        let mapped = transform.transform_points(points).unwrap();
        assert_eq!(mapped.into_data().as_slice::<f32>().unwrap(), &[1.5, 2.25, 0.0, 3.0]);
    }

    #[test]
    fn test_exact_at_nodes() {
        let device = Default::default();
        let transform = ramp_field();

        let points = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0], [1.0, 2.0], [0.0, 1.0]], &device);
        let disp = transform.displacements(points).unwrap();
        assert_eq!(
            disp.into_data().as_slice::<f32>().unwrap(),
            &[0.0, 0.0, 1.0, 20.0, 0.0, 10.0]
        );
    }

    #[test]
    fn test_exact_at_nodes_oblique() {
        let device = Default::default();
        // Rotated 90 degrees, anisotropic spacing, shifted origin
        let direction = DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]);
        let space = Arc::new(
            CoordinateSpace::from_geometry(vec![2, 3], &[10.0, -5.0], &[2.0, 0.5], &direction).unwrap(),
        );
        let transform = ramp_field_on(space.clone());

        let mut world = Vec::new();
        let mut expected = Vec::new();
        for i in 0..2 {
            for j in 0..3 {
                let node = space.index_to_world(&[i as f64, j as f64]).unwrap();
                world.extend(node.iter().map(|v| *v as f32));
                expected.extend([i as f32, 10.0 * j as f32]);
            }
        }
        let points = Tensor::<TestBackend, 2>::from_data(TensorData::new(world, Shape::new([6, 2])), &device);
        let disp = transform.displacements(points).unwrap();
        assert_eq!(disp.into_data().as_slice::<f32>().unwrap(), expected.as_slice());
    }

    #[test]
    fn test_non_finite_field_rejected() {
        let device = Default::default();
        let space = Arc::new(CoordinateSpace::identity(vec![2, 2]).unwrap());

        let mut values = vec![0.0f32; 8];
        values[3] = f32::NAN;
        let field = Tensor::<TestBackend, 3>::from_data(TensorData::new(values, Shape::new([2, 2, 2])), &device);
        assert!(matches!(
            DisplacementFieldTransform::new(field, space.clone()),
            Err(TransformError::InvalidParameter(_))
        ));

        let mut positions = vec![0.0f32; 8];
        positions[6] = f32::INFINITY;
        let field = Tensor::<TestBackend, 3>::from_data(TensorData::new(positions, Shape::new([2, 2, 2])), &device);
        assert!(matches!(
            DisplacementFieldTransform::from_deformation(field, space),
            Err(TransformError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_interpolates_between_nodes() {
        let device = Default::default();
        let transform = ramp_field();

        let points = Tensor::<TestBackend, 2>::from_floats([[0.5, 1.5]], &device);
        let mapped = transform.transform_points(points).unwrap();
        let data = mapped.into_data();
        let slice = data.as_slice::<f32>().unwrap();
        assert!((slice[0] - 1.0).abs() < 1e-6);
        assert!((slice[1] - 16.5).abs() < 1e-5);
    }

    #[test]
    fn test_scaled_space() {
        let device = Default::default();
        // Node spacing 2 along both axes, origin (10, 10)
        let space = Arc::new(
            CoordinateSpace::from_geometry(vec![2, 2], &[10.0, 10.0], &[2.0, 2.0], &DMatrix::identity(2, 2)).unwrap(),
        );
        let field = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![0.0f32, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0], Shape::new([2, 2, 2])),
            &device,
        );
        let transform = DisplacementFieldTransform::new(field, space).unwrap();

        // World (10, 11) is index (0, 0.5)
        let points = Tensor::<TestBackend, 2>::from_floats([[10.0, 11.0], [12.0, 12.0]], &device);
        let disp = transform.displacements(points).unwrap();
        let data = disp.into_data();
        let slice = data.as_slice::<f32>().unwrap();
        assert!((slice[1] - 2.0).abs() < 1e-5);
        assert!((slice[3] - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_boundary_policies() {
        let device = Default::default();
        let points = Tensor::<TestBackend, 2>::from_floats([[5.0, 2.0], [-3.0, 0.0]], &device);

        let clamped = ramp_field().displacements(points.clone()).unwrap();
        assert_eq!(clamped.into_data().as_slice::<f32>().unwrap(), &[1.0, 20.0, 0.0, 0.0]);

        let zeroed = ramp_field()
            .with_boundary(FieldBoundary::Zero)
            .displacements(points.clone())
            .unwrap();
        assert_eq!(zeroed.into_data().as_slice::<f32>().unwrap(), &[0.0, 0.0, 0.0, 0.0]);

        let strict = ramp_field().with_boundary(FieldBoundary::Error).displacements(points);
        assert!(matches!(strict, Err(TransformError::OutOfBounds(_))));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let device = Default::default();
        let space = Arc::new(CoordinateSpace::identity(vec![2, 3]).unwrap());
        let field = Tensor::<TestBackend, 3>::zeros([3, 2, 2], &device);
        assert!(matches!(
            DisplacementFieldTransform::new(field, space.clone()),
            Err(TransformError::InvalidParameter(_))
        ));

        let wrong_rank = Tensor::<TestBackend, 2>::zeros([6, 2], &device);
        assert!(DisplacementFieldTransform::new(wrong_rank, space).is_err());
    }

    #[test]
    fn test_from_deformation() {
        let device = Default::default();
        let space = Arc::new(CoordinateSpace::identity(vec![2, 2]).unwrap());
        // Every node maps to its own position shifted by (0.5, -1)
        let positions = vec![0.5f32, -1.0, 0.5, 0.0, 1.5, -1.0, 1.5, 0.0];
        let field = Tensor::<TestBackend, 3>::from_data(TensorData::new(positions, Shape::new([2, 2, 2])), &device);
        let transform = DisplacementFieldTransform::from_deformation(field, space).unwrap();

        let data = transform.rows().clone().into_data();
        assert_eq!(data.as_slice::<f32>().unwrap(), &[0.5, -1.0, 0.5, -1.0, 0.5, -1.0, 0.5, -1.0]);
    }

    #[test]
    fn test_inverse_requires_stored_field() {
        let device = Default::default();
        let space = Arc::new(CoordinateSpace::identity(vec![3, 3]).unwrap());
        let forward = DisplacementFieldTransform::<TestBackend>::zeros(space.clone(), &device);
        assert!(!forward.has_inverse());
        assert!(matches!(
            Transform::<TestBackend>::inverse(&forward),
            Err(TransformError::NotInvertible(_))
        ));

        let shift = Tensor::<TestBackend, 3>::ones([3, 3, 2], &device);
        let back = Tensor::<TestBackend, 3>::ones([3, 3, 2], &device).neg();
        let transform = DisplacementFieldTransform::new(shift, space.clone())
            .unwrap()
            .with_inverse(DisplacementFieldTransform::new(back, space).unwrap())
            .unwrap();
        assert!(transform.has_inverse());

        let inverse = Transform::<TestBackend>::inverse(&transform).unwrap();
        let points = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0]], &device);
        let mapped = inverse.transform_points(points.clone()).unwrap();
        assert_eq!(mapped.into_data().as_slice::<f32>().unwrap(), &[0.0, 0.0]);

        // The inverse's inverse is the original field
        let round = inverse.inverse().unwrap().transform_points(points).unwrap();
        assert_eq!(round.into_data().as_slice::<f32>().unwrap(), &[2.0, 2.0]);
    }
}
