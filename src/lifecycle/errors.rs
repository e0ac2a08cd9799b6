use thiserror::Error;

/// Request-level failures of the lifecycle controller.
///
/// None of these are fatal; the controller stays usable after every one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("No model is loaded")]
    NotReady,
    #[error("Sketch is empty")]
    EmptyInput,
    #[error("Dataset unavailable: {0}")]
    DatasetUnavailable(String),
    #[error("Model artifact not found: {key}")]
    ArtifactNotFound { key: String },
    #[error("Another model operation is running")]
    OperationInProgress,
    #[error("Training failed: {0}")]
    Training(String),
    #[error("Prediction failed: {0}")]
    Prediction(String),
    #[error("Model import failed: {0}")]
    ArtifactLoad(String),
    #[error("Model export failed: {0}")]
    Export(String),
}

impl LifecycleError {
    /// Whether the error is recorded in the status snapshot, not just returned.
    pub fn is_reported(&self) -> bool {
        !matches!(
            self,
            LifecycleError::NotReady
                | LifecycleError::EmptyInput
                | LifecycleError::OperationInProgress
        )
    }
}
