//! Image types.
//!
//! This module provides the Image type pairing tensor data with the
//! coordinate space it is sampled on.

pub mod image;

pub use image::Image;
