//! Homogeneous matrix helpers shared by coordinate spaces and affine transforms.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::DMatrix;

use crate::error::{Result, TransformError};

/// Determinant magnitude below which a linear block is treated as singular.
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Allowed deviation of the last row from `[0 ... 0 1]`.
const HOMOGENEOUS_ROW_TOLERANCE: f64 = 1e-8;

/// Validate a homogeneous `(n+1) x (n+1)` matrix and return `n`.
pub fn validate_homogeneous(matrix: &DMatrix<f64>) -> Result<usize> {
    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(TransformError::invalid_parameter(format!(
            "homogeneous matrix must be square, got {}x{}",
            rows, cols
        )));
    }
    if rows < 2 {
        return Err(TransformError::invalid_parameter(
            "homogeneous matrix needs at least one spatial dimension",
        ));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(TransformError::invalid_parameter(
            "homogeneous matrix contains non-finite values",
        ));
    }

    let n = rows - 1;
    for c in 0..=n {
        let expected = if c == n { 1.0 } else { 0.0 };
        if (matrix[(n, c)] - expected).abs() > HOMOGENEOUS_ROW_TOLERANCE {
            return Err(TransformError::invalid_parameter(format!(
                "last row of homogeneous matrix must be [0 ... 0 1], found {} at column {}",
                matrix[(n, c)],
                c
            )));
        }
    }
    Ok(n)
}

/// Determinant of the upper-left linear block.
pub fn linear_determinant(matrix: &DMatrix<f64>) -> f64 {
    let n = matrix.nrows() - 1;
    matrix.view((0, 0), (n, n)).clone_owned().determinant()
}

/// Invert a homogeneous matrix, failing when its linear block is singular.
pub fn invert_homogeneous(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let det = linear_determinant(matrix);
    if det.abs() < SINGULAR_TOLERANCE {
        return Err(TransformError::not_invertible(format!(
            "linear block determinant {:e} is below tolerance {:e}",
            det, SINGULAR_TOLERANCE
        )));
    }
    matrix
        .clone()
        .try_inverse()
        .ok_or_else(|| TransformError::not_invertible("matrix inversion failed"))
}

/// Apply a homogeneous matrix to a batch of row-vector points.
///
/// # Arguments
/// * `matrix` - `(n+1) x (n+1)` homogeneous matrix
/// * `points` - Tensor of shape `[Batch, n]`
///
/// # Returns
/// Tensor of shape `[Batch, n]`
pub fn apply_homogeneous<B: Backend>(matrix: &DMatrix<f64>, points: Tensor<B, 2>) -> Tensor<B, 2> {
    let n = matrix.nrows() - 1;
    let device = points.device();

    // Row-vector form: y = x @ A^T + t
    let mut a_t = Vec::with_capacity(n * n);
    for r in 0..n {
        for c in 0..n {
            a_t.push(matrix[(c, r)] as f32);
        }
    }
    let a_t = Tensor::<B, 2>::from_data(TensorData::new(a_t, Shape::new([n, n])), &device);

    let t: Vec<f32> = (0..n).map(|i| matrix[(i, n)] as f32).collect();
    let t = Tensor::<B, 2>::from_data(TensorData::new(t, Shape::new([1, n])), &device);

    points.matmul(a_t) + t
}

/// Apply a homogeneous matrix to a single point on the host.
pub fn apply_homogeneous_point(matrix: &DMatrix<f64>, point: &[f64]) -> Vec<f64> {
    let n = matrix.nrows() - 1;
    (0..n)
        .map(|r| {
            let linear: f64 = (0..n).map(|c| matrix[(r, c)] * point[c]).sum();
            linear + matrix[(r, n)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn scale_translate() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            4,
            &[
                2.0, 0.0, 0.0, 1.0, //
                0.0, 3.0, 0.0, 2.0, //
                0.0, 0.0, 4.0, 3.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        )
    }

    #[test]
    fn test_validate_homogeneous() {
        assert_eq!(validate_homogeneous(&scale_translate()).unwrap(), 3);

        let mut bad = scale_translate();
        bad[(3, 0)] = 0.5;
        assert!(matches!(
            validate_homogeneous(&bad),
            Err(TransformError::InvalidParameter(_))
        ));

        let rect = DMatrix::<f64>::zeros(3, 4);
        assert!(validate_homogeneous(&rect).is_err());
    }

    #[test]
    fn test_singular_detection() {
        let mut m = scale_translate();
        m[(2, 2)] = 0.0;
        assert!(matches!(
            invert_homogeneous(&m),
            Err(TransformError::NotInvertible(_))
        ));
    }

    #[test]
    fn test_apply_homogeneous_matches_host() {
        let device = Default::default();
        let m = scale_translate();
        let points = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0, 1.0], [0.0, -1.0, 2.0]], &device);

        let mapped = apply_homogeneous(&m, points);
        let data = mapped.into_data();
        let slice = data.as_slice::<f32>().unwrap();

        let expected_0 = apply_homogeneous_point(&m, &[1.0, 1.0, 1.0]);
        let expected_1 = apply_homogeneous_point(&m, &[0.0, -1.0, 2.0]);
        assert_eq!(expected_0, vec![3.0, 5.0, 7.0]);
        for i in 0..3 {
            assert!((slice[i] as f64 - expected_0[i]).abs() < 1e-6);
            assert!((slice[3 + i] as f64 - expected_1[i]).abs() < 1e-6);
        }
    }
}
