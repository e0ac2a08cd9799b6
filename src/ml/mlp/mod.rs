//! Single-hidden-layer MLP over flattened sketch tensors.

mod model;
mod train;

pub use model::MlpModel;
pub use train::{MlpClassifier, TrainOptions, train_mlp};
