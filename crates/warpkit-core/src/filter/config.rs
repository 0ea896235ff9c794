//! Resampling configuration.

use serde::{Deserialize, Serialize};

/// Default number of output nodes mapped per parallel chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 262_144;

/// Interpolation kernel used to sample the input grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Value of the nearest node.
    Nearest,
    /// Multilinear blend of the `2^D` surrounding nodes.
    #[default]
    Linear,
    /// Cubic B-spline over the `4^D` surrounding coefficients.
    Cubic,
}

/// Value assigned to output nodes that map outside the input grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FillPolicy {
    /// Use a fixed value.
    Constant(f64),
    /// Sample the nearest edge of the input grid.
    Clamp,
    /// Fail with `OutOfBounds`.
    Error,
}

impl Default for FillPolicy {
    fn default() -> Self {
        FillPolicy::Constant(0.0)
    }
}

/// Which way the supplied transform maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformDirection {
    /// The transform maps input (moving) points onto output (reference)
    /// points; its inverse is used to pull values.
    #[default]
    MovingToReference,
    /// The transform already maps output points into the input space.
    ReferenceToMoving,
}

/// Configuration for [`Resampler`](super::Resampler).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Interpolation kernel.
    pub interpolation: Interpolation,
    /// Out-of-bounds policy.
    pub fill: FillPolicy,
    /// Direction of the supplied transform.
    pub direction: TransformDirection,
    /// Convert samples to spline coefficients before cubic evaluation.
    pub prefilter: bool,
    /// Output nodes per parallel chunk.
    pub chunk_size: usize,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::default(),
            fill: FillPolicy::default(),
            direction: TransformDirection::default(),
            prefilter: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ResampleConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interpolation kernel.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the out-of-bounds policy.
    pub fn with_fill(mut self, fill: FillPolicy) -> Self {
        self.fill = fill;
        self
    }

    /// Set the transform direction.
    pub fn with_direction(mut self, direction: TransformDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Enable or disable spline prefiltering.
    pub fn with_prefilter(mut self, prefilter: bool) -> Self {
        self.prefilter = prefilter;
        self
    }

    /// Set the chunk size; zero is raised to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}
