//! B-Spline interpolation implementation.
//!
//! This module provides cubic B-Spline interpolation for smooth sampling
//! of image values at continuous coordinates.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use super::boundary::columns;
use super::trait_::Interpolator;
use crate::space::grid::strides;

/// Cubic B-Spline interpolator.
///
/// Evaluates `sum_k c[k] * beta3(x - k)` over the 4 nearest coefficients per
/// axis, with mirror-symmetric extension past the grid edges. The data passed
/// to `interpolate` must already be spline coefficients (see
/// [`spline_coefficients`](super::prefilter::spline_coefficients)) for the
/// spline to pass through the samples; raw samples give a smoothing
/// approximation instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct BSplineInterpolator;

impl BSplineInterpolator {
    /// Create a new B-Spline interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for BSplineInterpolator {
    fn interpolate(&self, data: &Tensor<B, 1>, shape: &[usize], indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let strides = strides(shape);
        let [batch, _] = indices.dims();
        let device = indices.device();

        // Per axis: 4 neighbour offsets (already scaled by stride) and weights
        let axes: Vec<(Vec<Tensor<B, 1, Int>>, Vec<Tensor<B, 1>>)> = columns(indices)
            .into_iter()
            .zip(shape)
            .zip(&strides)
            .map(|((x, &n), &stride)| {
                let base = x.clone().floor();
                let t = x - base.clone();
                let offsets = (0..4)
                    .map(|k| mirror(base.clone().add_scalar(k as f64 - 1.0), n).int() * stride as i32)
                    .collect();
                (offsets, cubic_weights(t))
            })
            .collect();

        let ndim = axes.len();
        let mut acc = Tensor::<B, 1>::zeros([batch], &device);
        for combo in 0..4usize.pow(ndim as u32) {
            let mut rem = combo;
            let mut offset: Option<Tensor<B, 1, Int>> = None;
            let mut weight: Option<Tensor<B, 1>> = None;
            for (offsets, weights) in &axes {
                let k = rem % 4;
                rem /= 4;
                offset = Some(match offset {
                    Some(o) => o + offsets[k].clone(),
                    None => offsets[k].clone(),
                });
                weight = Some(match weight {
                    Some(w) => w * weights[k].clone(),
                    None => weights[k].clone(),
                });
            }
            if let (Some(o), Some(w)) = (offset, weight) {
                acc = acc + data.clone().gather(0, o) * w;
            }
        }
        acc
    }
}

/// Reflect integer-valued indices into `[0, n - 1]` (mirror without edge repeat).
fn mirror<B: Backend>(j: Tensor<B, 1>, n: usize) -> Tensor<B, 1> {
    let last = (n - 1) as f64;
    // last - |last - |j||
    j.abs()
        .mul_scalar(-1.0)
        .add_scalar(last)
        .abs()
        .mul_scalar(-1.0)
        .add_scalar(last)
        .clamp(0.0, last)
}

/// Cubic B-spline weights for neighbours at offsets -1, 0, 1, 2.
fn cubic_weights<B: Backend>(t: Tensor<B, 1>) -> Vec<Tensor<B, 1>> {
    let t2 = t.clone() * t.clone();
    let t3 = t2.clone() * t.clone();
    let omt = t.clone().mul_scalar(-1.0).add_scalar(1.0);

    let w0 = (omt.clone() * omt.clone() * omt).div_scalar(6.0);
    let w1 = (t3.clone().mul_scalar(3.0) - t2.clone().mul_scalar(6.0)).add_scalar(4.0).div_scalar(6.0);
    let w2 = (t3.clone().mul_scalar(-3.0) + t2.mul_scalar(3.0) + t.mul_scalar(3.0))
        .add_scalar(1.0)
        .div_scalar(6.0);
    let w3 = t3.div_scalar(6.0);
    vec![w0, w1, w2, w3]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::prefilter::spline_coefficients;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_weights_partition_of_unity() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 1>::from_floats([0.0, 0.25, 0.5, 0.9], &device);
        let weights = cubic_weights(t);
        let sum = weights.into_iter().reduce(|a, b| a + b).unwrap();
        for v in sum.into_data().as_slice::<f32>().unwrap() {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mirror() {
        let device = Default::default();
        let j = Tensor::<TestBackend, 1>::from_floats([-2.0, -1.0, 0.0, 3.0, 4.0, 5.0], &device);
        let m = mirror(j, 4);
        assert_eq!(m.into_data().as_slice::<f32>().unwrap(), &[2.0, 1.0, 0.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_bspline_reproduces_samples_with_prefilter() {
        let device = Default::default();
        // Shape [3, 4]
        let samples = [1.0, 2.0, 0.0, -1.0, 4.0, 3.0, 2.5, 1.0, 0.0, 7.0, 2.0, 3.0];
        let data = Tensor::<TestBackend, 1>::from_floats(samples, &device);
        let coefficients = spline_coefficients(&data, &[3, 4]).unwrap();

        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[0.0, 0.0], [1.0, 2.0], [2.0, 3.0], [2.0, 1.0]],
            &device,
        );
        let result = BSplineInterpolator::new().interpolate(&coefficients, &[3, 4], indices);
        let data = result.into_data();
        let slice = data.as_slice::<f32>().unwrap();

        assert!((slice[0] - 1.0).abs() < 1e-4);
        assert!((slice[1] - 2.5).abs() < 1e-4);
        assert!((slice[2] - 3.0).abs() < 1e-4);
        assert!((slice[3] - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_bspline_linear_ramp_between_nodes() {
        let device = Default::default();
        // Mirror boundaries bend the ramp slightly; the interior stays close
        let samples: Vec<f32> = (0..10).map(|i| 2.0 * i as f32).collect();
        let data = Tensor::<TestBackend, 1>::from_floats(samples.as_slice(), &device);
        let coefficients = spline_coefficients(&data, &[10]).unwrap();

        let indices = Tensor::<TestBackend, 2>::from_floats([[4.5], [5.25]], &device);
        let result = BSplineInterpolator::new().interpolate(&coefficients, &[10], indices);
        let data = result.into_data();
        let slice = data.as_slice::<f32>().unwrap();

        assert!((slice[0] - 9.0).abs() < 1e-2);
        assert!((slice[1] - 10.5).abs() < 1e-2);
    }
}
