//! Labeled training data for the classifier.

mod shapes;

pub use shapes::{GeneratedShapes, ShapeKind};

use thiserror::Error;

use crate::tensor::{Tensor, TensorError, TensorShape};

/// Errors raised while producing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset has no training examples")]
    Empty,
    #[error("Invalid label: {0}")]
    Label(#[from] TensorError),
    #[error("Dataset generation failed: {0}")]
    Generation(String),
}

/// One input tensor with its one-hot class label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub data: Tensor,
    pub label: Tensor,
}

impl LabeledExample {
    pub fn new(data: Tensor, class_index: usize, classes: usize) -> Result<Self, TensorError> {
        Ok(Self {
            data,
            label: Tensor::one_hot(class_index, classes)?,
        })
    }

    /// Index of the hot entry of the label.
    pub fn class_index(&self) -> Option<usize> {
        self.label.argmax().map(|(index, _)| index)
    }
}

/// Disjoint training and validation splits over a fixed class list.
///
/// Immutable once built; training workers share it by reference.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub classes: Vec<String>,
    pub training: Vec<LabeledExample>,
    pub validation: Vec<LabeledExample>,
}

impl Dataset {
    /// `true` when there is nothing to fit on.
    pub fn is_empty(&self) -> bool {
        self.training.is_empty()
    }

    /// Shape of the first training input.
    pub fn input_shape(&self) -> Option<TensorShape> {
        self.training.first().map(|example| example.data.shape())
    }
}

/// Produces datasets for training.
pub trait DatasetSource: Send + Sync {
    /// Class labels, indexed like the one-hot labels of built examples.
    fn class_labels(&self) -> Vec<String>;

    /// Build a fresh dataset. May be slow; called off the interactive thread.
    fn build(&self) -> Result<Dataset, DatasetError>;
}
