//! Chained transform implementation.
//!
//! This module composes any number of transforms into one.
//! T(x) = Tn(...T2(T1(x)))

use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::affine::AffineTransform;
use super::trait_::{check_points, SharedTransform, Transform};
use crate::error::{Result, TransformError};
use crate::space::CoordinateSpace;

/// Ordered composition of shared transforms.
///
/// Members are applied in construction order: the first member maps the
/// chain's moving space, the last produces points in its reference space.
/// Mixing linear and nonlinear members is allowed.
#[derive(Debug, Clone)]
pub struct TransformChain<B: Backend> {
    transforms: Vec<SharedTransform<B>>,
    ndim: usize,
}

impl<B: Backend> TransformChain<B> {
    /// Create a chain from transforms in application order.
    ///
    /// # Errors
    /// `InvalidParameter` for an empty list. `SpaceMismatch` when adjacent
    /// members differ in dimensionality, or when one member's reference
    /// space and the next member's moving space disagree on it.
    pub fn new(transforms: Vec<SharedTransform<B>>) -> Result<Self> {
        let ndim = validate(&transforms)?;
        tracing::debug!("Built transform chain of {} members ({}D)", transforms.len(), ndim);
        Ok(Self { transforms, ndim })
    }

    /// Chain of two transforms: `first`, then `second`.
    pub fn pair(first: SharedTransform<B>, second: SharedTransform<B>) -> Result<Self> {
        Self::new(vec![first, second])
    }

    /// New chain with `transform` applied after all current members.
    pub fn append(&self, transform: SharedTransform<B>) -> Result<Self> {
        let mut transforms = self.transforms.clone();
        transforms.push(transform);
        Self::new(transforms)
    }

    /// New chain with `transform` applied before all current members.
    pub fn prepend(&self, transform: SharedTransform<B>) -> Result<Self> {
        self.insert(0, transform)
    }

    /// New chain with `transform` placed at position `index`.
    ///
    /// # Errors
    /// `IndexOutOfRange` when `index > len()`, plus the validation errors of `new`.
    pub fn insert(&self, index: usize, transform: SharedTransform<B>) -> Result<Self> {
        if index > self.transforms.len() {
            return Err(TransformError::IndexOutOfRange {
                index,
                len: self.transforms.len(),
            });
        }
        let mut transforms = self.transforms.clone();
        transforms.insert(index, transform);
        Self::new(transforms)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether the chain has no members; never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Members in application order.
    pub fn transforms(&self) -> &[SharedTransform<B>] {
        &self.transforms
    }
}

fn validate<B: Backend>(transforms: &[SharedTransform<B>]) -> Result<usize> {
    let ndim = match transforms.first() {
        Some(first) => first.ndim(),
        None => return Err(TransformError::invalid_parameter("a transform chain needs at least one member")),
    };

    for (i, pair) in transforms.windows(2).enumerate() {
        let (before, after) = (&pair[0], &pair[1]);
        if after.ndim() != ndim {
            return Err(TransformError::ndim_mismatch(
                &format!("chain member #{}", i + 1),
                ndim,
                after.ndim(),
            ));
        }
        if let (Some(out_space), Some(in_space)) = (before.reference(), after.moving()) {
            if out_space.ndim() != in_space.ndim() {
                return Err(TransformError::space_mismatch(format!(
                    "chain member #{} outputs {}D points but member #{} expects {}D input",
                    i,
                    out_space.ndim(),
                    i + 1,
                    in_space.ndim()
                )));
            }
        }
    }
    Ok(ndim)
}

impl<B: Backend> Transform<B> for TransformChain<B> {
    fn ndim(&self) -> usize {
        self.ndim
    }

    fn transform_points(&self, points: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        check_points(&points, self.ndim)?;
        self.transforms
            .iter()
            .try_fold(points, |points, transform| transform.transform_points(points))
    }

    fn inverse(&self) -> Result<SharedTransform<B>> {
        let inverted = self
            .transforms
            .iter()
            .rev()
            .map(|t| t.inverse())
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(Self::new(inverted)?))
    }

    fn reference(&self) -> Option<&Arc<CoordinateSpace>> {
        self.transforms.last().and_then(|t| t.reference())
    }

    fn moving(&self) -> Option<&Arc<CoordinateSpace>> {
        self.transforms.first().and_then(|t| t.moving())
    }

    /// Collapse the chain into one affine when every member is linear.
    fn as_affine(&self) -> Option<AffineTransform> {
        let mut members = self.transforms.iter();
        let first = members.next()?.as_affine()?;
        members.try_fold(first, |acc, t| t.as_affine()?.compose(&acc).ok())
    }
}
