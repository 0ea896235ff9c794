//! Resampling filters.

pub mod config;
pub mod resample;

pub use config::{FillPolicy, Interpolation, ResampleConfig, TransformDirection, DEFAULT_CHUNK_SIZE};
pub use resample::Resampler;
