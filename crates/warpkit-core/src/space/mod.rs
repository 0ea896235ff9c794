//! Coordinate spaces and grid helpers.
//!
//! This module provides the `CoordinateSpace` descriptor shared by images and
//! transforms, plus the homogeneous-matrix and grid utilities built on it.

pub mod coordinate_space;
pub mod grid;
pub mod homogeneous;

pub use coordinate_space::CoordinateSpace;
pub use grid::{generate_grid, generate_grid_range};
pub use homogeneous::SINGULAR_TOLERANCE;
