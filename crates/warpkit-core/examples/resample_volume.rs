//! Resampling Example
//!
//! This example resamples a synthetic 3D volume through an affine, a chain
//! mixing an affine with a displacement field, and a per-volume series:
//!
//! 1. Build a spherical phantom on a 1mm grid
//! 2. Resample it onto a coarser oblique grid through a rotation
//! 3. Chain the rotation with a smooth displacement field
//! 4. Resample a short time series with one affine per frame
//!
//! Usage:
//!   cargo run --example resample_volume

use std::f64::consts::PI;
use std::sync::Arc;

use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use nalgebra::DMatrix;
use warpkit_core::transform::SharedTransform;
use warpkit_core::{
    AffineTransform, CoordinateSpace, DisplacementFieldTransform, Image, Interpolation, LinearTransformsMapping,
    ResampleConfig, Resampler, TransformChain, TransformDirection,
};

type Backend = NdArray<f32>;

const SIZE: usize = 32;

fn phantom(device: &<Backend as burn::tensor::backend::Backend>::Device) -> Tensor<Backend, 3> {
    let center = (SIZE as f64 - 1.0) / 2.0;
    let radius = SIZE as f64 / 4.0;
    let mut values = Vec::with_capacity(SIZE * SIZE * SIZE);
    for i in 0..SIZE {
        for j in 0..SIZE {
            for k in 0..SIZE {
                let r = ((i as f64 - center).powi(2) + (j as f64 - center).powi(2) + (k as f64 - center).powi(2)).sqrt();
                values.push(if r < radius { 100.0f32 } else { 0.0 });
            }
        }
    }
    Tensor::from_data(TensorData::new(values, Shape::new([SIZE, SIZE, SIZE])), device)
}

fn summary(name: &str, data: &Tensor<Backend, 3>) {
    let mean = data.clone().mean().into_scalar();
    let max = data.clone().max().into_scalar();
    println!("  {}: shape {:?}, mean {:.3}, max {:.3}", name, data.dims(), mean, max);
}

fn main() -> anyhow::Result<()> {
    println!("warpkit Resampling Example");
    println!("==========================\n");

    // Initialize tracing for logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    let device = Default::default();

    // =======================================================================
    // Step 1: Phantom
    // =======================================================================
    println!("Step 1: Building phantom...");
    let input_space = Arc::new(CoordinateSpace::identity(vec![SIZE, SIZE, SIZE])?);
    let image = Image::new(phantom(&device), input_space.clone())?;
    summary("input", image.data());

    // =======================================================================
    // Step 2: Affine onto an oblique 2mm grid
    // =======================================================================
    println!("\nStep 2: Rotating onto an oblique 2mm grid...");
    let angle = PI / 12.0;
    let direction = DMatrix::from_row_slice(
        3,
        3,
        &[angle.cos(), -angle.sin(), 0.0, angle.sin(), angle.cos(), 0.0, 0.0, 0.0, 1.0],
    );
    let output_space = Arc::new(CoordinateSpace::from_geometry(
        vec![SIZE / 2, SIZE / 2, SIZE / 2],
        &[2.0, -2.0, 0.0],
        &[2.0, 2.0, 2.0],
        &direction,
    )?);

    let mut rotation = DMatrix::<f64>::identity(4, 4);
    rotation[(0, 0)] = angle.cos();
    rotation[(0, 1)] = -angle.sin();
    rotation[(1, 0)] = angle.sin();
    rotation[(1, 1)] = angle.cos();
    let affine = AffineTransform::new(rotation)?
        .with_moving(input_space.clone())?
        .with_reference(output_space.clone())?;

    let resampler = Resampler::new(ResampleConfig::new().with_interpolation(Interpolation::Cubic));
    let rotated = resampler.apply(&image, &affine, output_space.clone())?;
    summary("rotated (cubic)", rotated.data());

    // =======================================================================
    // Step 3: Affine followed by a displacement field
    // =======================================================================
    println!("\nStep 3: Chaining with a displacement field...");
    let field_shape = [8usize, 8, 8];
    let field_space = Arc::new(CoordinateSpace::from_geometry(
        field_shape.to_vec(),
        &[0.0, 0.0, 0.0],
        &[4.0, 4.0, 4.0],
        &DMatrix::identity(3, 3),
    )?);
    let mut field = Vec::with_capacity(field_shape.iter().product::<usize>() * 3);
    for i in 0..field_shape[0] {
        for _ in 0..field_shape[1] {
            for _ in 0..field_shape[2] {
                let phase = 2.0 * PI * i as f64 / field_shape[0] as f64;
                field.extend_from_slice(&[0.0f32, 0.0, (1.5 * phase.sin()) as f32]);
            }
        }
    }
    let field = Tensor::<Backend, 4>::from_data(TensorData::new(field, Shape::new([8, 8, 8, 3])), &device);
    let warp = DisplacementFieldTransform::new(field, field_space)?;

    // Field maps reference points into the input; the inverse affine follows it
    let members: Vec<SharedTransform<Backend>> = vec![Arc::new(warp), Arc::new(affine.inverse()?)];
    let chain = TransformChain::new(members)?;

    let pull = Resampler::new(ResampleConfig::new().with_direction(TransformDirection::ReferenceToMoving));
    let warped = pull.resample(image.data(), &input_space, &chain, &input_space)?;
    summary("warped (linear)", &warped);

    // =======================================================================
    // Step 4: Time series
    // =======================================================================
    println!("\nStep 4: Resampling a 4-frame series...");
    let frames = vec![image.data().clone(); 4];
    let mapping = LinearTransformsMapping::from_transforms(
        (0..4)
            .map(|t| AffineTransform::from_translation(&[0.5 * t as f64, 0.0, 0.0]))
            .collect::<Result<Vec<_>, _>>()?,
    )?;
    let series = Resampler::default().resample_series(&frames, &input_space, &mapping, &input_space)?;
    for (t, frame) in series.iter().enumerate() {
        summary(&format!("frame {}", t), frame);
    }

    println!("\nDone (warpkit {}).", warpkit_core::VERSION);
    Ok(())
}
