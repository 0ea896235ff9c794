//! Image type pairing tensor data with a coordinate space.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{Result, TransformError};
use crate::space::CoordinateSpace;

/// Volumetric image with physical metadata.
///
/// Combines tensor data (potentially on GPU) with the shared coordinate space
/// that describes how its indices map to world coordinates.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
/// * `D` - The tensor rank, equal to the space's number of axes
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use warpkit_core::{CoordinateSpace, Image};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let space = Arc::new(CoordinateSpace::identity(vec![10, 10, 10]).unwrap());
/// let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
/// let image = Image::new(data, space).unwrap();
/// assert_eq!(image.shape(), [10, 10, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    space: Arc<CoordinateSpace>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image.
    ///
    /// # Errors
    /// `SpaceMismatch` when the rank differs from the space's axes,
    /// `ShapeMismatch` when the tensor shape differs from the grid shape.
    pub fn new(data: Tensor<B, D>, space: Arc<CoordinateSpace>) -> Result<Self> {
        validate_data(&data, &space)?;
        Ok(Self { data, space })
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Get the coordinate space.
    pub fn space(&self) -> &Arc<CoordinateSpace> {
        &self.space
    }

    /// Get the image shape as an array.
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Consume the image, returning its data.
    pub fn into_data(self) -> Tensor<B, D> {
        self.data
    }
}

/// Check that a data tensor conforms to a coordinate space.
pub(crate) fn validate_data<B: Backend, const D: usize>(
    data: &Tensor<B, D>,
    space: &CoordinateSpace,
) -> Result<()> {
    if D != space.ndim() {
        return Err(TransformError::ndim_mismatch("image rank", space.ndim(), D));
    }
    let dims = data.dims();
    if dims.as_slice() != space.shape() {
        return Err(TransformError::ShapeMismatch {
            expected: space.shape().to_vec(),
            actual: dims.to_vec(),
        });
    }
    Ok(())
}
