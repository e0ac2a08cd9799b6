//! Fixed-shape `f32` tensors used as classifier input and labels.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of a 3-D tensor addressed by `(row, column, channel)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape {
    pub rows: usize,
    pub columns: usize,
    pub channels: usize,
}

impl TensorShape {
    pub const fn new(rows: usize, columns: usize, channels: usize) -> Self {
        Self {
            rows,
            columns,
            channels,
        }
    }

    /// Single-channel image shape.
    pub const fn grayscale(rows: usize, columns: usize) -> Self {
        Self::new(rows, columns, 1)
    }

    /// Row vector of `len` entries, used for labels and output distributions.
    pub const fn vector(len: usize) -> Self {
        Self::new(1, len, 1)
    }

    /// Number of scalars in the flattened buffer.
    pub const fn len(&self) -> usize {
        self.rows * self.columns * self.channels
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for TensorShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.rows, self.columns, self.channels)
    }
}

/// Errors raised when constructing tensors from raw buffers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TensorError {
    #[error("Buffer of {actual} values does not fit shape {shape} ({expected} values)")]
    ShapeMismatch {
        shape: TensorShape,
        expected: usize,
        actual: usize,
    },
    #[error("One-hot index {index} out of range for {classes} classes")]
    ClassOutOfRange { index: usize, classes: usize },
}

/// Row-major 3-D array of `f32`.
///
/// The flattened index of `(row, column, channel)` is
/// `(row * columns + column) * channels + channel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: TensorShape,
    data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: TensorShape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    pub fn from_vec(shape: TensorShape, data: Vec<f32>) -> Result<Self, TensorError> {
        if data.len() != shape.len() {
            return Err(TensorError::ShapeMismatch {
                shape,
                expected: shape.len(),
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// One-hot row vector with `1.0` at `index`.
    pub fn one_hot(index: usize, classes: usize) -> Result<Self, TensorError> {
        if index >= classes {
            return Err(TensorError::ClassOutOfRange { index, classes });
        }
        let mut label = Self::zeros(TensorShape::vector(classes));
        label.data[index] = 1.0;
        Ok(label)
    }

    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub fn get(&self, row: usize, column: usize, channel: usize) -> Option<f32> {
        if row >= self.shape.rows || column >= self.shape.columns || channel >= self.shape.channels
        {
            return None;
        }
        let idx = (row * self.shape.columns + column) * self.shape.channels + channel;
        self.data.get(idx).copied()
    }

    /// True when any entry differs from zero.
    pub fn has_signal(&self) -> bool {
        self.data.iter().any(|&v| v != 0.0)
    }

    /// Index of the largest entry; equal maxima resolve to the lowest index.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        argmax(&self.data)
    }
}

/// Index and value of the largest finite entry; ties keep the first one seen.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((idx, value)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_ties_resolve_to_lowest_index() {
        assert_eq!(argmax(&[0.5, 0.5, 0.0]), Some((0, 0.5)));
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some((1, 0.7)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn argmax_skips_nan_entries() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.1]), Some((1, 0.2)));
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Tensor::from_vec(TensorShape::grayscale(2, 2), vec![0.0; 3]).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                shape: TensorShape::grayscale(2, 2),
                expected: 4,
                actual: 3,
            }
        );
    }

    #[test]
    fn get_uses_row_major_layout() {
        let shape = TensorShape::new(2, 3, 2);
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let tensor = Tensor::from_vec(shape, data).unwrap();
        assert_eq!(tensor.get(1, 2, 1), Some(11.0));
        assert_eq!(tensor.get(0, 1, 0), Some(2.0));
        assert_eq!(tensor.get(2, 0, 0), None);
    }

    #[test]
    fn one_hot_sets_single_entry() {
        let label = Tensor::one_hot(2, 4).unwrap();
        assert_eq!(label.as_slice(), &[0.0, 0.0, 1.0, 0.0]);
        assert!(Tensor::one_hot(4, 4).is_err());
    }
}
