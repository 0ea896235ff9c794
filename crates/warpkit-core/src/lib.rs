//! Coordinate spaces, composable spatial transforms and image resampling.
//!
//! Transforms map batches of world points (`Tensor<B, 2>` of shape
//! `[N, ndim]`) from a moving space to a reference space. The [`Resampler`]
//! pulls image values onto an output grid through any of them.

pub mod error;
pub mod filter;
pub mod image;
pub mod interpolation;
pub mod space;
pub mod transform;

pub use error::{Result, TransformError};
pub use filter::{FillPolicy, Interpolation, ResampleConfig, Resampler, TransformDirection};
pub use image::Image;
pub use space::CoordinateSpace;
pub use transform::{
    AffineTransform, DisplacementFieldTransform, FieldBoundary, LinearTransformsMapping, SharedTransform, Transform,
    TransformChain,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
