//! Interpolation types and operations.
//!
//! This module provides interpolation traits and implementations
//! for sampling values at continuous coordinates.

pub mod boundary;
pub mod bspline;
pub mod linear;
pub mod nearest;
pub mod prefilter;
pub mod trait_;

pub use bspline::BSplineInterpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use prefilter::spline_coefficients;
pub use trait_::Interpolator;
