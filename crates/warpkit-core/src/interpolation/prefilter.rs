//! Cubic B-spline prefiltering.
//!
//! Converts sampled values into B-spline coefficients so that evaluating the
//! cubic spline at grid nodes reproduces the samples. Uses the recursive
//! causal/anti-causal filter pair with mirror-symmetric boundaries, applied
//! separably along every axis.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{Result, TransformError};
use crate::space::grid::strides;

/// Pole of the cubic B-spline prefilter.
const CUBIC_POLE: f64 = -0.267_949_192_431_122_7; // sqrt(3) - 2

/// Truncation tolerance for the causal initialisation sum.
const INIT_TOLERANCE: f64 = 1e-10;

/// Compute cubic B-spline coefficients for flattened grid data.
///
/// # Arguments
/// * `data` - Flattened values `[N]`, row-major over `shape`
/// * `shape` - Grid shape
pub fn spline_coefficients<B: Backend>(data: &Tensor<B, 1>, shape: &[usize]) -> Result<Tensor<B, 1>> {
    let device = data.device();
    let mut values = data
        .clone()
        .into_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .map_err(|e| TransformError::invalid_parameter(format!("cannot read image data: {:?}", e)))?;

    tracing::debug!("Prefiltering {} samples on grid {:?}", values.len(), shape);
    prefilter_in_place(&mut values, shape);

    let n = values.len();
    let coefficients: Vec<f32> = values.into_iter().map(|v| v as f32).collect();
    Ok(Tensor::from_data(TensorData::new(coefficients, Shape::new([n])), &device))
}

/// Prefilter a row-major buffer along every axis.
pub fn prefilter_in_place(values: &mut [f64], shape: &[usize]) {
    let strides = strides(shape);
    let total: usize = shape.iter().product();
    let mut line = Vec::new();

    for (axis, &n) in shape.iter().enumerate() {
        if n < 2 {
            continue;
        }
        let stride = strides[axis];
        let block = n * stride;
        for outer in 0..total / block {
            for inner in 0..stride {
                let start = outer * block + inner;
                line.clear();
                line.extend((0..n).map(|k| values[start + k * stride]));
                filter_line(&mut line);
                for (k, v) in line.iter().enumerate() {
                    values[start + k * stride] = *v;
                }
            }
        }
    }
}

fn filter_line(c: &mut [f64]) {
    let n = c.len();
    let z = CUBIC_POLE;
    let gain = (1.0 - z) * (1.0 - 1.0 / z);

    for v in c.iter_mut() {
        *v *= gain;
    }

    c[0] = initial_causal(c, z);
    for k in 1..n {
        c[k] += z * c[k - 1];
    }

    c[n - 1] = (z / (z * z - 1.0)) * (z * c[n - 2] + c[n - 1]);
    for k in (0..n - 1).rev() {
        c[k] = z * (c[k + 1] - c[k]);
    }
}

fn initial_causal(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let horizon = (INIT_TOLERANCE.ln() / z.abs().ln()).ceil() as usize;

    if horizon < n {
        let mut zn = z;
        let mut sum = c[0];
        for v in &c[1..horizon] {
            sum += zn * v;
            zn *= z;
        }
        sum
    } else {
        // Exact mirror-boundary initialisation for short lines
        let iz = 1.0 / z;
        let mut zn = z;
        let mut z2n = z.powi(n as i32 - 1);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for v in &c[1..n - 1] {
            sum += (zn + z2n) * v;
            zn *= z;
            z2n *= iz;
        }
        sum / (1.0 - zn * zn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Evaluate a 1D cubic spline at an integer node with mirror boundaries.
    fn eval_at_node(c: &[f64], i: usize) -> f64 {
        let n = c.len() as isize;
        let mirror = |j: isize| -> usize {
            let l = n - 1;
            (l - (l - j.abs()).abs()) as usize
        };
        let i = i as isize;
        (c[mirror(i - 1)] + 4.0 * c[mirror(i)] + c[mirror(i + 1)]) / 6.0
    }

    #[test]
    fn test_prefilter_reproduces_samples_long_line() {
        let samples: Vec<f64> = (0..40).map(|i| ((i as f64) * 0.37).sin() * 10.0).collect();
        let mut c = samples.clone();
        prefilter_in_place(&mut c, &[40]);
        for (i, s) in samples.iter().enumerate() {
            assert!((eval_at_node(&c, i) - s).abs() < 1e-8, "node {}", i);
        }
    }

    #[test]
    fn test_prefilter_reproduces_samples_short_line() {
        let samples = vec![1.0, 5.0, -2.0, 4.0, 0.5];
        let mut c = samples.clone();
        prefilter_in_place(&mut c, &[5]);
        for (i, s) in samples.iter().enumerate() {
            assert!((eval_at_node(&c, i) - s).abs() < 1e-8, "node {}", i);
        }
    }

    #[test]
    fn test_prefilter_constant_is_fixed_point() {
        let mut c = vec![3.0; 24];
        prefilter_in_place(&mut c, &[2, 3, 4]);
        for v in c {
            assert!((v - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_singleton_axis_untouched() {
        let mut c = vec![7.0];
        prefilter_in_place(&mut c, &[1]);
        assert_eq!(c, vec![7.0]);
    }
}
