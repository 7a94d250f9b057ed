//! Shaped tensor values
//!
//! This module provides `ShapedTensor`, the immutable value the translator
//! moves between a checkpoint and a parameter store: a flat row-major f32
//! buffer plus shape metadata, validated at construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraducirError};

/// Immutable row-major f32 tensor with shape metadata
///
/// Invariant: `shape.iter().product() == data.len()`, shape is non-empty
/// and contains no zero dimension. Checked once at construction; every
/// consumer may rely on it.
///
/// # Examples
///
/// ```
/// use traducir::ShapedTensor;
///
/// let t = ShapedTensor::from_vec(vec![2, 3], vec![
///     1.0, 2.0, 3.0,
///     4.0, 5.0, 6.0,
/// ]).unwrap();
///
/// assert_eq!(t.shape(), &[2, 3]);
/// assert_eq!(t.ndim(), 2);
/// assert_eq!(t.size(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapedTensor {
    /// Flattened data in row-major order
    data: Vec<f32>,
    /// Shape of the tensor
    shape: Vec<usize>,
}

impl ShapedTensor {
    /// Create a new tensor from a shape and flattened row-major data
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` if the shape is empty or contains a zero
    /// dimension, and `ShapeMismatch` if the data length does not equal the
    /// shape product.
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        if shape.is_empty() {
            return Err(TraducirError::InvalidShape {
                reason: "shape cannot be empty".to_string(),
            });
        }

        if shape.contains(&0) {
            return Err(TraducirError::InvalidShape {
                reason: format!("shape dimensions cannot be zero: {shape:?}"),
            });
        }

        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TraducirError::ShapeMismatch {
                name: "<unnamed>".to_string(),
                expected: shape.clone(),
                actual: vec![data.len()],
            });
        }

        Ok(Self { data, shape })
    }

    /// Shape of the tensor
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Flattened row-major data
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume the tensor, yielding its data buffer
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Element at (row, col) of a 2-D tensor
    ///
    /// # Panics
    ///
    /// Debug-asserts that the tensor is 2-D and the indices are in bounds;
    /// used by tests and the transpose kernel, both of which check first.
    #[must_use]
    pub fn at2(&self, row: usize, col: usize) -> f32 {
        debug_assert_eq!(self.ndim(), 2, "at2 requires a 2-D tensor");
        debug_assert!(row < self.shape[0] && col < self.shape[1]);
        self.data[row * self.shape[1] + col]
    }
}

impl fmt::Display for ShapedTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShapedTensor(shape={:?}, {} elements)",
            self.shape,
            self.data.len()
        )
    }
}
