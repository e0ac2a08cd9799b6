//! Classifier capabilities and the bundled MLP implementation.
//!
//! The lifecycle controller only talks to the [`Classifier`], [`TrainedModel`]
//! and [`Predictor`] traits; [`mlp`] is one implementation of them.

pub mod metrics;
pub mod mlp;

use crate::dataset::Dataset;
use crate::tensor::{Tensor, TensorShape, argmax};

pub use metrics::MetricsSnapshot;

/// Maps input tensors to class-probability distributions.
///
/// Implementations are pure for a fixed model and may be called from any thread.
pub trait Predictor: Send + Sync {
    /// Class labels, indexed like the output distribution.
    fn classes(&self) -> &[String];

    /// One output distribution per input, in order.
    fn predict(&self, inputs: &[Tensor]) -> Vec<Vec<f32>>;

    /// Input shape the model was fitted on, when it records one.
    fn input_shape(&self) -> Option<TensorShape> {
        None
    }
}

/// A fitted or imported model that can be persisted.
pub trait TrainedModel: Predictor {
    /// Serialize into an opaque artifact payload.
    fn export(&self, compress: bool) -> Result<Vec<u8>, String>;
}

/// Typed event sink for a running fit.
pub trait TrainingObserver: Sync {
    /// Periodic metrics, at most once every configured number of batches.
    fn on_metrics(&self, snapshot: MetricsSnapshot);

    /// Metrics at the end of an epoch, including validation results.
    fn on_epoch_completed(&self, snapshot: MetricsSnapshot) {
        self.on_metrics(snapshot);
    }

    /// Checked at epoch boundaries; `true` ends the fit with the current weights.
    fn should_stop(&self) -> bool {
        false
    }
}

/// Trains models over a dataset and rebuilds them from artifacts.
pub trait Classifier: Send + Sync {
    fn fit(
        &self,
        dataset: &Dataset,
        observer: &dyn TrainingObserver,
    ) -> Result<Box<dyn TrainedModel>, String>;

    fn load(&self, payload: &[u8]) -> Result<Box<dyn TrainedModel>, String>;
}

/// Winning class of an output distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub class_index: usize,
    /// Maximum entry of the distribution, clamped to `[0, 1]`.
    pub confidence: f32,
}

impl Prediction {
    /// Pick the argmax class; ties go to the lowest index.
    pub fn from_distribution(distribution: &[f32], classes: &[String]) -> Option<Self> {
        let (class_index, confidence) = argmax(distribution)?;
        let label = classes.get(class_index)?.clone();
        Some(Self {
            label,
            class_index,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    /// Confidence as a percentage string, e.g. `97.0%`.
    pub fn confidence_text(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["Circle".into(), "Rectangle".into(), "Triangle".into()]
    }

    #[test]
    fn tie_picks_lowest_index() {
        let prediction = Prediction::from_distribution(&[0.5, 0.5, 0.0], &classes()).unwrap();
        assert_eq!(prediction.class_index, 0);
        assert_eq!(prediction.label, "Circle");
        assert_eq!(prediction.confidence, 0.5);
    }

    #[test]
    fn confidence_is_clamped_and_formatted() {
        let prediction = Prediction::from_distribution(&[0.1, 1.2, 0.0], &classes()).unwrap();
        assert_eq!(prediction.label, "Rectangle");
        assert_eq!(prediction.confidence, 1.0);
        assert_eq!(prediction.confidence_text(), "100.0%");
    }

    #[test]
    fn distribution_longer_than_classes_is_rejected() {
        assert!(Prediction::from_distribution(&[0.0, 0.0, 0.0, 0.9], &classes()).is_none());
        assert!(Prediction::from_distribution(&[], &classes()).is_none());
    }
}
