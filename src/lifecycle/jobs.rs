//! Background workers and the messages they send back to the controller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Instant;

use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::dataset::{Dataset, DatasetError, DatasetSource};
use crate::ml::{
    Classifier, MetricsSnapshot, Prediction, Predictor, TrainedModel, TrainingObserver,
};
use crate::tensor::{Tensor, TensorShape};

pub(super) type OperationId = u64;

pub(super) enum JobMessage {
    DatasetBuilt {
        op: OperationId,
        result: Result<Dataset, DatasetError>,
    },
    Metrics {
        op: OperationId,
        snapshot: MetricsSnapshot,
    },
    TrainingFinished {
        op: OperationId,
        result: Result<TrainingOutcome, String>,
    },
    PredictionFinished {
        op: OperationId,
        result: Result<Prediction, String>,
    },
    ImportFinished {
        op: OperationId,
        result: Result<Arc<dyn TrainedModel>, String>,
    },
}

pub(super) struct TrainingOutcome {
    pub(super) model: Arc<dyn TrainedModel>,
    /// Where the trained model was exported, if it was.
    pub(super) exported: Option<PathBuf>,
}

/// Post-fit export destination.
pub(super) struct ExportPlan {
    pub(super) store: ArtifactStore,
    pub(super) key: String,
    pub(super) compress: bool,
}

/// Forwards fit progress over the job channel and exposes the stop flag.
struct ChannelObserver {
    op: OperationId,
    tx: Sender<JobMessage>,
    stop: Arc<AtomicBool>,
}

impl TrainingObserver for ChannelObserver {
    fn on_metrics(&self, snapshot: MetricsSnapshot) {
        // receiver gone: controller dropped
        let _ = self.tx.send(JobMessage::Metrics {
            op: self.op,
            snapshot,
        });
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Job channel plus operation id allocation.
pub(super) struct LifecycleJobs {
    message_tx: Sender<JobMessage>,
    message_rx: Receiver<JobMessage>,
    next_op_id: OperationId,
}

impl LifecycleJobs {
    pub(super) fn new() -> Self {
        let (message_tx, message_rx) = mpsc::channel();
        Self {
            message_tx,
            message_rx,
            next_op_id: 1,
        }
    }

    pub(super) fn next_op_id(&mut self) -> OperationId {
        let op = self.next_op_id;
        self.next_op_id = self.next_op_id.wrapping_add(1).max(1);
        op
    }

    pub(super) fn try_recv_message(&self) -> Result<JobMessage, TryRecvError> {
        self.message_rx.try_recv()
    }

    pub(super) fn spawn_dataset_build(&self, op: OperationId, source: Arc<dyn DatasetSource>) {
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let started_at = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| source.build())).unwrap_or_else(|_| {
                Err(DatasetError::Generation(
                    "Dataset worker panicked".to_string(),
                ))
            });
            info!("Dataset build finished in {:.2?}", started_at.elapsed());
            // receiver gone: controller dropped
            let _ = tx.send(JobMessage::DatasetBuilt { op, result });
        });
    }

    pub(super) fn spawn_fit(
        &self,
        op: OperationId,
        classifier: Arc<dyn Classifier>,
        dataset: Arc<Dataset>,
        stop: Arc<AtomicBool>,
        export: Option<ExportPlan>,
    ) {
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let started_at = Instant::now();
            let observer = ChannelObserver {
                op,
                tx: tx.clone(),
                stop,
            };
            let result = catch_unwind(AssertUnwindSafe(|| classifier.fit(&dataset, &observer)))
                .unwrap_or_else(|_| Err("Training worker panicked".to_string()))
                .map(|model| {
                    let model: Arc<dyn TrainedModel> = Arc::from(model);
                    let exported = export.and_then(|plan| export_trained(model.as_ref(), &plan));
                    TrainingOutcome { model, exported }
                });
            info!("Training finished in {:.2?}", started_at.elapsed());
            // receiver gone: controller dropped
            let _ = tx.send(JobMessage::TrainingFinished { op, result });
        });
    }

    pub(super) fn spawn_prediction(
        &self,
        op: OperationId,
        model: Arc<dyn TrainedModel>,
        tensor: Tensor,
        cancel: Arc<AtomicBool>,
    ) {
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let result = catch_unwind(AssertUnwindSafe(|| {
                let distribution = model
                    .predict(std::slice::from_ref(&tensor))
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                Prediction::from_distribution(&distribution, model.classes())
                    .ok_or_else(|| "Model returned no usable distribution".to_string())
            }))
            .unwrap_or_else(|_| Err("Prediction worker panicked".to_string()));
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            // receiver gone: controller dropped
            let _ = tx.send(JobMessage::PredictionFinished { op, result });
        });
    }

    /// Load the artifact at `path`, rejecting models fitted on another input shape.
    pub(super) fn spawn_import(
        &self,
        op: OperationId,
        path: PathBuf,
        classifier: Arc<dyn Classifier>,
        expected_shape: Option<TensorShape>,
    ) {
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = std::fs::read(&path)
                .map_err(|err| format!("Failed to read {}: {err}", path.display()))
                .and_then(|bytes| {
                    catch_unwind(AssertUnwindSafe(|| classifier.load(&bytes)))
                        .unwrap_or_else(|_| Err("Import worker panicked".to_string()))
                })
                .and_then(|model| {
                    check_input_shape(model.as_ref(), expected_shape)?;
                    Ok(model)
                })
                .map(Arc::from);
            // receiver gone: controller dropped
            let _ = tx.send(JobMessage::ImportFinished { op, result });
        });
    }
}

/// Models that record no input shape are accepted as-is.
fn check_input_shape(
    model: &dyn TrainedModel,
    expected: Option<TensorShape>,
) -> Result<(), String> {
    match (model.input_shape(), expected) {
        (Some(actual), Some(expected)) if actual != expected => Err(format!(
            "model expects {actual} input but the canvas produces {expected}"
        )),
        _ => Ok(()),
    }
}

fn export_trained(model: &dyn TrainedModel, plan: &ExportPlan) -> Option<PathBuf> {
    let written = model
        .export(plan.compress)
        .and_then(|bytes| {
            plan.store
                .write(&plan.key, &bytes)
                .map_err(|err| err.to_string())
        });
    match written {
        Ok(path) => {
            info!("Exported trained model to {}", path.display());
            Some(path)
        }
        Err(err) => {
            warn!("Export of trained model failed: {err}");
            None
        }
    }
}
