//! Transform types and operations.
//!
//! This module provides the transform trait and its implementations:
//! affine maps, per-volume affine series, dense displacement fields and
//! chains mixing all of them.

pub mod affine;
pub mod chain;
pub mod displacement_field;
pub mod linear_mapping;
pub mod trait_;

pub use affine::{AffineTransform, EQUALITY_TOLERANCE};
pub use chain::TransformChain;
pub use displacement_field::{DisplacementFieldTransform, FieldBoundary};
pub use linear_mapping::LinearTransformsMapping;
pub use trait_::{SharedTransform, Transform};
