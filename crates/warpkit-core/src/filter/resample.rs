//! Resample filter.
//!
//! This module provides the Resampler, which pulls the values of an input
//! tensor onto the grid of an output coordinate space through a transform.

use std::ops::Range;
use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rayon::prelude::*;

use super::config::{FillPolicy, Interpolation, ResampleConfig, TransformDirection};
use crate::error::{Result, TransformError};
use crate::image::image::validate_data;
use crate::image::Image;
use crate::interpolation::boundary::{clamp_to_grid, count_true, outside_mask, snap_to_grid, GRID_SNAP_TOLERANCE};
use crate::interpolation::{
    spline_coefficients, BSplineInterpolator, Interpolator, LinearInterpolator, NearestNeighborInterpolator,
};
use crate::space::CoordinateSpace;
use crate::transform::{LinearTransformsMapping, SharedTransform, Transform, EQUALITY_TOLERANCE};

/// Resample filter.
///
/// For every node of the output grid: index → world (output affine) → pull
/// transform → world in the input space → continuous input index →
/// interpolated value. The output grid is split into chunks mapped in
/// parallel and concatenated in order; any failing chunk fails the call.
///
/// Under [`TransformDirection::MovingToReference`] the supplied transform
/// maps input points onto output points and its inverse does the pulling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resampler {
    config: ResampleConfig,
}

/// Values of one output chunk and how many of its nodes fell outside.
struct Chunk<B: Backend> {
    values: Tensor<B, 1>,
    outside: usize,
}

impl Resampler {
    /// Create a resampler.
    pub fn new(config: ResampleConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    /// Resample a tensor onto the grid of `output_space`.
    ///
    /// # Arguments
    /// * `input` - Input values, shape equal to `input_space.shape()`
    /// * `input_space` - Grid of the input values
    /// * `transform` - Transform between the two spaces, see [`TransformDirection`]
    /// * `output_space` - Grid to produce
    ///
    /// # Returns
    /// Tensor with the output space's shape
    ///
    /// # Errors
    /// `SpaceMismatch`/`ShapeMismatch` on incompatible inputs, `NotInvertible`
    /// when the pull transform cannot be formed, `OutOfBounds` under
    /// [`FillPolicy::Error`].
    pub fn resample<B: Backend, const D: usize>(
        &self,
        input: &Tensor<B, D>,
        input_space: &CoordinateSpace,
        transform: &dyn Transform<B>,
        output_space: &CoordinateSpace,
    ) -> Result<Tensor<B, D>> {
        validate_data(input, input_space)?;
        if output_space.ndim() != D {
            return Err(TransformError::ndim_mismatch("output space", D, output_space.ndim()));
        }
        if transform.ndim() != D {
            return Err(TransformError::ndim_mismatch("transform", D, transform.ndim()));
        }
        self.log_grid_differences(transform, input_space, output_space);

        let inverse: Option<SharedTransform<B>> = match self.config.direction {
            TransformDirection::MovingToReference => Some(transform.inverse()?),
            TransformDirection::ReferenceToMoving => None,
        };
        let pull: &dyn Transform<B> = match &inverse {
            Some(t) => t.as_ref(),
            None => transform,
        };

        let device = input.device();
        let input_shape = input_space.shape();
        let mut data = input.clone().reshape([input_space.num_voxels()]);
        if self.config.interpolation == Interpolation::Cubic && self.config.prefilter {
            data = spline_coefficients(&data, input_shape)?;
        }
        let interpolator = make_interpolator::<B>(self.config.interpolation);

        let total = output_space.num_voxels();
        let ranges = chunk_ranges(total, self.config.chunk_size);
        tracing::debug!(
            "Resampling {:?} -> {:?} in {} chunks of up to {} nodes",
            input_shape,
            output_space.shape(),
            ranges.len(),
            self.config.chunk_size
        );

        let chunks = ranges
            .into_par_iter()
            .map(|range| {
                let world = output_space.grid_world::<B>(range, &device);
                let mapped = pull.transform_points(world)?;
                let indices = snap_to_grid(input_space.world_to_index_tensor(mapped)?, GRID_SNAP_TOLERANCE);
                self.sample_chunk(&data, input_shape, interpolator.as_ref(), indices)
            })
            .collect::<Result<Vec<_>>>()?;

        let outside: usize = chunks.iter().map(|c| c.outside).sum();
        let values = Tensor::cat(chunks.into_iter().map(|c| c.values).collect(), 0);

        let mut dims = [0usize; D];
        dims.copy_from_slice(output_space.shape());

        tracing::info!(
            "Resampled {} nodes ({} outside the input grid, fill {:?})",
            total,
            outside,
            self.config.fill
        );
        Ok(values.reshape(dims))
    }

    /// Resample an image onto `output_space`.
    pub fn apply<B: Backend, const D: usize>(
        &self,
        image: &Image<B, D>,
        transform: &dyn Transform<B>,
        output_space: Arc<CoordinateSpace>,
    ) -> Result<Image<B, D>> {
        let data = self.resample(image.data(), image.space(), transform, &output_space)?;
        Image::new(data, output_space)
    }

    /// Resample every frame of a series with its own affine.
    ///
    /// Frame `t` is resampled through `mapping.get(t)`. Frames are processed
    /// in parallel and returned in order.
    ///
    /// # Errors
    /// `InvalidParameter` when the frame count differs from the mapping length,
    /// plus any error of [`Resampler::resample`].
    pub fn resample_series<B: Backend, const D: usize>(
        &self,
        frames: &[Tensor<B, D>],
        input_space: &CoordinateSpace,
        mapping: &LinearTransformsMapping,
        output_space: &CoordinateSpace,
    ) -> Result<Vec<Tensor<B, D>>> {
        if frames.len() != mapping.len() {
            return Err(TransformError::invalid_parameter(format!(
                "{} frames but {} affines in the mapping",
                frames.len(),
                mapping.len()
            )));
        }

        frames
            .par_iter()
            .enumerate()
            .map(|(t, frame)| {
                let affine = mapping.get(t)?;
                self.resample(frame, input_space, affine, output_space)
            })
            .collect()
    }

    fn sample_chunk<B: Backend>(
        &self,
        data: &Tensor<B, 1>,
        shape: &[usize],
        interpolator: &dyn Interpolator<B>,
        indices: Tensor<B, 2>,
    ) -> Result<Chunk<B>> {
        let outside = outside_mask(indices.clone(), shape);
        let n_outside = count_true(outside.clone());

        if n_outside > 0 && self.config.fill == FillPolicy::Error {
            return Err(TransformError::out_of_bounds(format!(
                "{} output nodes map outside the input grid {:?}",
                n_outside, shape
            )));
        }

        let values = interpolator.interpolate(data, shape, clamp_to_grid(indices, shape));
        let values = match self.config.fill {
            FillPolicy::Constant(value) if n_outside > 0 => values.mask_fill(outside, value),
            _ => values,
        };
        Ok(Chunk {
            values,
            outside: n_outside,
        })
    }

    /// Note when the spaces a transform carries are not the grids it is
    /// resampled between. Only dimensionality is binding; field transforms
    /// legitimately report their own sampling grid.
    fn log_grid_differences<B: Backend>(
        &self,
        transform: &dyn Transform<B>,
        input_space: &CoordinateSpace,
        output_space: &CoordinateSpace,
    ) {
        let (domain, codomain) = match self.config.direction {
            TransformDirection::MovingToReference => (input_space, output_space),
            TransformDirection::ReferenceToMoving => (output_space, input_space),
        };
        if let Some(moving) = transform.moving() {
            if !moving.same_grid(domain, EQUALITY_TOLERANCE) {
                tracing::debug!(
                    "Transform moving space {:?} differs from the grid it maps from {:?}",
                    moving.shape(),
                    domain.shape()
                );
            }
        }
        if let Some(reference) = transform.reference() {
            if !reference.same_grid(codomain, EQUALITY_TOLERANCE) {
                tracing::debug!(
                    "Transform reference space {:?} differs from the grid it maps to {:?}",
                    reference.shape(),
                    codomain.shape()
                );
            }
        }
    }
}

fn make_interpolator<B: Backend>(kind: Interpolation) -> Box<dyn Interpolator<B>> {
    match kind {
        Interpolation::Nearest => Box::new(NearestNeighborInterpolator::new()),
        Interpolation::Linear => Box::new(LinearInterpolator::new()),
        Interpolation::Cubic => Box::new(BSplineInterpolator::new()),
    }
}

/// Split `0..total` into consecutive ranges of at most `chunk_size`.
fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..total)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(total))
        .collect()
}
