use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::jobs::{ExportPlan, JobMessage, LifecycleJobs, OperationId, TrainingOutcome};
use super::status::{StatusReader, StatusSnapshot, StatusWriter, status_store};
use super::{LifecycleError, LifecycleState, LifecycleStatus};
use crate::artifacts::{ArtifactError, ArtifactStore, export_key};
use crate::config::AppConfig;
use crate::dataset::{Dataset, DatasetError, DatasetSource};
use crate::ml::{Classifier, MetricsSnapshot, Prediction, TrainedModel};
use crate::tensor::{Tensor, TensorShape};

/// Presentation-level triggers, mapped 1:1 onto controller operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Predict(Tensor),
    Train,
    ImportModel(String),
    Idle,
}

/// Behavior knobs for the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleOptions {
    /// Export after every successful fit.
    pub export_on_complete: bool,
    pub export_compressed: bool,
    /// Exported artifacts are named `<prefix>-<uuid>`.
    pub export_prefix: String,
    /// Imports of models fitted on another shape are rejected; `None` accepts any.
    pub input_shape: Option<TensorShape>,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for LifecycleOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            export_on_complete: config.training.export_on_complete,
            export_compressed: config.training.export_compressed,
            export_prefix: config.model.import_key.clone(),
            input_shape: Some(config.canvas.grid().tensor_shape()),
        }
    }
}

/// Capabilities injected into the controller.
#[derive(Clone)]
pub struct Capabilities {
    pub dataset: Arc<dyn DatasetSource>,
    pub classifier: Arc<dyn Classifier>,
}

/// The operation the controller is currently waiting on.
enum ActiveOperation {
    BuildingDataset {
        op: OperationId,
    },
    Training {
        op: OperationId,
        stop: Arc<AtomicBool>,
    },
    Predicting {
        op: OperationId,
        cancel: Arc<AtomicBool>,
    },
    Importing {
        op: OperationId,
        key: String,
        ready_before: bool,
    },
}

impl ActiveOperation {
    fn op(&self) -> OperationId {
        match self {
            ActiveOperation::BuildingDataset { op }
            | ActiveOperation::Training { op, .. }
            | ActiveOperation::Predicting { op, .. }
            | ActiveOperation::Importing { op, .. } => *op,
        }
    }

    fn state(&self) -> LifecycleState {
        match self {
            ActiveOperation::BuildingDataset { .. } => LifecycleState::BuildingDataset,
            ActiveOperation::Training { .. } => LifecycleState::Training,
            ActiveOperation::Predicting { .. } => LifecycleState::Predicting,
            ActiveOperation::Importing { .. } => LifecycleState::Importing,
        }
    }
}

/// Owns the model and serializes train/predict/import requests.
///
/// All methods run on the interactive thread and never block on background
/// work; call [`poll`](Self::poll) regularly to apply finished jobs.
pub struct ModelLifecycleController {
    capabilities: Capabilities,
    store: ArtifactStore,
    options: LifecycleOptions,
    status: StatusWriter,
    jobs: LifecycleJobs,
    active: Option<ActiveOperation>,
    ready: bool,
    dataset: Option<Arc<Dataset>>,
    model: Option<Arc<dyn TrainedModel>>,
    /// Progress key of the last applied metrics, per operation.
    last_metrics: Option<(OperationId, (usize, usize))>,
}

impl ModelLifecycleController {
    pub fn new(capabilities: Capabilities, store: ArtifactStore, options: LifecycleOptions) -> Self {
        let (status, _) = status_store();
        let controller = Self {
            capabilities,
            store,
            options,
            status,
            jobs: LifecycleJobs::new(),
            active: None,
            ready: false,
            dataset: None,
            model: None,
            last_metrics: None,
        };
        controller.publish(|_| {});
        controller
    }

    /// New read-only handle onto the status.
    pub fn reader(&self) -> StatusReader {
        self.status.reader()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn status(&self) -> LifecycleStatus {
        LifecycleStatus::new(self.state(), self.ready)
    }

    pub fn state(&self) -> LifecycleState {
        self.active
            .as_ref()
            .map_or(LifecycleState::Idle, ActiveOperation::state)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn artifact_store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run the operation behind a presentation trigger.
    pub fn perform(&mut self, action: Action) -> Result<(), LifecycleError> {
        match action {
            Action::Predict(tensor) => self.predict(tensor),
            Action::Train => self.train(),
            Action::ImportModel(key) => self.import_model(&key),
            Action::Idle => {
                self.idle();
                Ok(())
            }
        }
    }

    /// Start training, building the dataset first if none exists yet.
    pub fn train(&mut self) -> Result<(), LifecycleError> {
        self.ensure_free("train")?;
        let op = self.jobs.next_op_id();
        match self.dataset.clone() {
            Some(dataset) => self.start_fit(op, dataset),
            None => {
                info!("Building dataset");
                self.active = Some(ActiveOperation::BuildingDataset { op });
                self.jobs
                    .spawn_dataset_build(op, Arc::clone(&self.capabilities.dataset));
                self.publish(|snapshot| {
                    snapshot.text = "Building dataset…".to_string();
                    snapshot.subtext.clear();
                    snapshot.last_error = None;
                });
            }
        }
        Ok(())
    }

    /// Classify `tensor` in the background.
    ///
    /// A newer request supersedes an in-flight one; the older result is discarded.
    pub fn predict(&mut self, tensor: Tensor) -> Result<(), LifecycleError> {
        let Some(model) = self.model.clone().filter(|_| self.ready) else {
            debug!("Predict rejected: no model loaded");
            return Err(LifecycleError::NotReady);
        };
        if !tensor.has_signal() {
            debug!("Predict skipped: empty sketch");
            return Err(LifecycleError::EmptyInput);
        }
        match &self.active {
            None => {}
            Some(ActiveOperation::Predicting { op, cancel }) => {
                debug!("Prediction {op} superseded");
                cancel.store(true, Ordering::Relaxed);
            }
            Some(_) => {
                debug!("Predict rejected: {} in progress", self.state());
                return Err(LifecycleError::OperationInProgress);
            }
        }
        let op = self.jobs.next_op_id();
        let cancel = Arc::new(AtomicBool::new(false));
        self.active = Some(ActiveOperation::Predicting {
            op,
            cancel: Arc::clone(&cancel),
        });
        self.jobs.spawn_prediction(op, model, tensor, cancel);
        self.publish(|_| {});
        Ok(())
    }

    /// Load the artifact stored under `key` and swap it in on success.
    ///
    /// An unknown key fails immediately and leaves readiness untouched.
    pub fn import_model(&mut self, key: &str) -> Result<(), LifecycleError> {
        self.ensure_free("import")?;
        let path = match self.store.resolve(key) {
            Ok(path) => path,
            Err(err) => {
                warn!("Model import failed: {err}");
                let error = match err {
                    ArtifactError::NotFound { .. } | ArtifactError::InvalidKey { .. } => {
                        LifecycleError::ArtifactNotFound {
                            key: key.to_string(),
                        }
                    }
                    other => LifecycleError::ArtifactLoad(other.to_string()),
                };
                self.report(error.clone());
                return Err(error);
            }
        };
        info!("Importing model {key} from {}", path.display());
        let op = self.jobs.next_op_id();
        let ready_before = self.ready;
        self.ready = false;
        self.active = Some(ActiveOperation::Importing {
            op,
            key: key.to_string(),
            ready_before,
        });
        self.jobs.spawn_import(
            op,
            path,
            Arc::clone(&self.capabilities.classifier),
            self.options.input_shape,
        );
        self.publish(|snapshot| {
            snapshot.text = "Importing model…".to_string();
            snapshot.subtext = key.to_string();
            snapshot.last_error = None;
        });
        Ok(())
    }

    /// Ask a running fit to finish at the next epoch boundary.
    pub fn stop_training(&mut self) -> bool {
        match &self.active {
            Some(ActiveOperation::Training { stop, .. }) => {
                info!("Stop requested for training");
                stop.store(true, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Drop an in-flight prediction so its result is never published.
    pub fn cancel_prediction(&mut self) -> bool {
        let Some(ActiveOperation::Predicting { op, cancel }) = &self.active else {
            return false;
        };
        debug!("Prediction {op} cancelled");
        cancel.store(true, Ordering::Relaxed);
        self.active = None;
        self.publish(|_| {});
        true
    }

    /// Forget the current prediction and its display text.
    pub fn clear_prediction(&mut self) {
        self.cancel_prediction();
        self.publish(|snapshot| {
            if snapshot.prediction.take().is_some() {
                snapshot.text.clear();
                snapshot.subtext.clear();
            }
        });
    }

    /// Idle trigger: apply finished background work without starting anything.
    pub fn idle(&mut self) {
        self.poll();
    }

    /// Write the current model to the artifact store under `key`.
    pub fn export_model(&self, key: &str, compress: bool) -> Result<PathBuf, LifecycleError> {
        let model = self.model.as_ref().ok_or(LifecycleError::NotReady)?;
        let bytes = model.export(compress).map_err(LifecycleError::Export)?;
        self.store
            .write(key, &bytes)
            .map_err(|err| LifecycleError::Export(err.to_string()))
    }

    /// Drain finished background jobs and apply their results.
    pub fn poll(&mut self) {
        while let Ok(message) = self.jobs.try_recv_message() {
            match message {
                JobMessage::DatasetBuilt { op, result } => self.on_dataset_built(op, result),
                JobMessage::Metrics { op, snapshot } => self.on_metrics(op, snapshot),
                JobMessage::TrainingFinished { op, result } => self.on_training_finished(op, result),
                JobMessage::PredictionFinished { op, result } => {
                    self.on_prediction_finished(op, result)
                }
                JobMessage::ImportFinished { op, result } => self.on_import_finished(op, result),
            }
        }
    }

    fn ensure_free(&self, request: &str) -> Result<(), LifecycleError> {
        if let Some(active) = &self.active {
            debug!("{request} rejected: {} in progress", active.state());
            return Err(LifecycleError::OperationInProgress);
        }
        Ok(())
    }

    fn is_current(&self, op: OperationId) -> bool {
        self.active.as_ref().is_some_and(|active| active.op() == op)
    }

    fn start_fit(&mut self, op: OperationId, dataset: Arc<Dataset>) {
        info!(
            "Training on {} examples ({} validation)",
            dataset.training.len(),
            dataset.validation.len()
        );
        let stop = Arc::new(AtomicBool::new(false));
        let export = self.options.export_on_complete.then(|| ExportPlan {
            store: self.store.clone(),
            key: export_key(&self.options.export_prefix),
            compress: self.options.export_compressed,
        });
        self.active = Some(ActiveOperation::Training {
            op,
            stop: Arc::clone(&stop),
        });
        self.last_metrics = None;
        self.jobs.spawn_fit(
            op,
            Arc::clone(&self.capabilities.classifier),
            dataset,
            stop,
            export,
        );
        self.publish(|snapshot| {
            snapshot.text = "Training…".to_string();
            snapshot.subtext.clear();
            snapshot.metrics = None;
            snapshot.last_error = None;
        });
    }

    fn on_dataset_built(&mut self, op: OperationId, result: Result<Dataset, DatasetError>) {
        if !self.is_current(op) {
            debug!("Dropping stale dataset result for operation {op}");
            return;
        }
        let dataset = match result {
            Ok(dataset) if dataset.is_empty() => return self.fail_dataset(DatasetError::Empty),
            Ok(dataset) => Arc::new(dataset),
            Err(err) => return self.fail_dataset(err),
        };
        self.dataset = Some(Arc::clone(&dataset));
        self.start_fit(op, dataset);
    }

    fn fail_dataset(&mut self, err: DatasetError) {
        warn!("Dataset unavailable: {err}");
        self.active = None;
        self.report(LifecycleError::DatasetUnavailable(err.to_string()));
    }

    fn on_metrics(&mut self, op: OperationId, metrics: MetricsSnapshot) {
        if !matches!(&self.active, Some(ActiveOperation::Training { op: current, .. }) if *current == op)
        {
            return;
        }
        let key = metrics.progress_key();
        if let Some((last_op, last_key)) = self.last_metrics
            && last_op == op
            && key < last_key
        {
            debug!("Dropping out-of-order metrics {key:?} for operation {op}");
            return;
        }
        self.last_metrics = Some((op, key));
        self.publish(|snapshot| {
            snapshot.text = metrics.loss_text();
            snapshot.subtext = metrics.accuracy_text();
            snapshot.metrics = Some(metrics);
        });
    }

    fn on_training_finished(&mut self, op: OperationId, result: Result<TrainingOutcome, String>) {
        if !self.is_current(op) {
            debug!("Dropping stale training result for operation {op}");
            return;
        }
        self.active = None;
        match result {
            Ok(TrainingOutcome { model, exported }) => {
                info!("Training complete; model ready");
                if let Some(path) = &exported {
                    debug!("Trained model stored at {}", path.display());
                }
                self.model = Some(model);
                self.ready = true;
                self.publish(|snapshot| {
                    if snapshot.metrics.is_none() {
                        snapshot.text = "Training complete".to_string();
                    }
                    snapshot.prediction = None;
                    snapshot.last_error = None;
                });
            }
            Err(err) => {
                warn!("Training failed: {err}");
                self.report(LifecycleError::Training(err));
            }
        }
    }

    fn on_prediction_finished(&mut self, op: OperationId, result: Result<Prediction, String>) {
        let Some(ActiveOperation::Predicting { op: current, cancel }) = &self.active else {
            debug!("Dropping prediction {op}: no prediction pending");
            return;
        };
        if *current != op || cancel.load(Ordering::Relaxed) {
            debug!("Dropping stale prediction {op}");
            return;
        }
        self.active = None;
        match result {
            Ok(prediction) => {
                debug!(
                    "Predicted {} ({:.3})",
                    prediction.label, prediction.confidence
                );
                self.publish(|snapshot| {
                    snapshot.text = prediction.label.clone();
                    snapshot.subtext = prediction.confidence_text();
                    snapshot.prediction = Some(prediction);
                    if matches!(snapshot.last_error, Some(LifecycleError::Prediction(_))) {
                        snapshot.last_error = None;
                    }
                });
            }
            Err(err) => {
                warn!("Prediction failed: {err}");
                let error = LifecycleError::Prediction(err);
                self.publish(|snapshot| {
                    snapshot.text = error.to_string();
                    snapshot.subtext.clear();
                    snapshot.prediction = None;
                    snapshot.last_error = Some(error);
                });
            }
        }
    }

    fn on_import_finished(
        &mut self,
        op: OperationId,
        result: Result<Arc<dyn TrainedModel>, String>,
    ) {
        let Some(ActiveOperation::Importing {
            op: current,
            key,
            ready_before,
        }) = self.active.take()
        else {
            debug!("Dropping import result {op}: no import pending");
            return;
        };
        if current != op {
            debug!("Dropping stale import result {op}");
            self.active = Some(ActiveOperation::Importing {
                op: current,
                key,
                ready_before,
            });
            return;
        }
        match result {
            Ok(model) => {
                info!("Imported model {key}");
                self.model = Some(model);
                self.ready = true;
                self.publish(|snapshot| {
                    snapshot.text = "Model imported".to_string();
                    snapshot.subtext = key;
                    snapshot.prediction = None;
                    snapshot.last_error = None;
                });
            }
            Err(err) => {
                warn!("Model import failed: {err}");
                self.ready = ready_before;
                self.report(LifecycleError::ArtifactLoad(err));
            }
        }
    }

    /// Publish `error` when it belongs in the status.
    fn report(&self, error: LifecycleError) {
        if !error.is_reported() {
            return;
        }
        self.publish(|snapshot| {
            snapshot.text = error.to_string();
            snapshot.subtext.clear();
            snapshot.last_error = Some(error);
        });
    }

    fn publish(&self, edit: impl FnOnce(&mut StatusSnapshot)) {
        let status = self.status();
        self.status.update(|snapshot| {
            snapshot.status = status;
            edit(snapshot);
        });
    }
}
