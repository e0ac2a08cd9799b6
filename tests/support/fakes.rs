//! Scriptable stand-ins for the dataset and classifier capabilities.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use shape_sketch::artifacts::ArtifactStore;
use shape_sketch::dataset::{Dataset, DatasetError, DatasetSource, LabeledExample};
use shape_sketch::lifecycle::{Capabilities, LifecycleOptions, ModelLifecycleController};
use shape_sketch::ml::{
    Classifier, MetricsSnapshot, Predictor, TrainedModel, TrainingObserver,
};
use shape_sketch::tensor::{Tensor, TensorShape};

const ARTIFACT_PREFIX: &str = "fake-model:";
const INPUT_LEN: usize = 4;

/// One-shot latch that background fakes block on until the test opens it.
#[derive(Clone, Default)]
pub struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub fn open(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn wait(&self) {
        let (lock, cvar) = &*self.0;
        let guard = lock.lock().unwrap();
        let _ = cvar
            .wait_timeout_while(guard, Duration::from_secs(5), |open| !*open)
            .unwrap();
    }
}

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Input the fake model classifies as `class`; `slow` inputs wait on the predict gate.
pub fn sketch(class: usize, slow: bool) -> Tensor {
    let slow = if slow { 1.0 } else { 0.0 };
    Tensor::from_vec(TensorShape::vector(INPUT_LEN), vec![class as f32, slow, 0.0, 1.0]).unwrap()
}

/// Artifact payload that the fake classifier loads as a model over `input_len` inputs.
pub fn artifact_bytes(input_len: usize, classes: &[String]) -> Vec<u8> {
    format!("{ARTIFACT_PREFIX}{input_len}:{}", classes.join(",")).into_bytes()
}

/// Input shape of [`sketch`] tensors.
pub fn sketch_shape() -> TensorShape {
    TensorShape::vector(INPUT_LEN)
}

/// Input the fake model answers with a uniform distribution.
pub fn tie_sketch() -> Tensor {
    Tensor::from_vec(TensorShape::vector(INPUT_LEN), vec![0.0, 0.0, 1.0, 1.0]).unwrap()
}

pub fn metrics(epoch: usize, batch: usize) -> MetricsSnapshot {
    MetricsSnapshot {
        epoch,
        batch,
        loss: 1.0 / (1 + epoch * 10 + batch) as f32,
        accuracy: 0.5,
        val_loss: None,
        val_accuracy: None,
        batch_time: Duration::ZERO,
    }
}

pub struct FakeDataset {
    classes: Vec<String>,
    failures_left: AtomicUsize,
    empty: bool,
    builds: AtomicUsize,
}

impl FakeDataset {
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            failures_left: AtomicUsize::new(0),
            empty: false,
            builds: AtomicUsize::new(0),
        }
    }

    /// Fails the first `times` builds, then succeeds.
    pub fn failing(classes: Vec<String>, times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
            ..Self::new(classes)
        }
    }

    pub fn empty(classes: Vec<String>) -> Self {
        Self {
            empty: true,
            ..Self::new(classes)
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl DatasetSource for FakeDataset {
    fn class_labels(&self) -> Vec<String> {
        self.classes.clone()
    }

    fn build(&self) -> Result<Dataset, DatasetError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DatasetError::Generation("generator offline".to_string()));
        }
        let mut dataset = Dataset {
            classes: self.classes.clone(),
            ..Dataset::default()
        };
        if self.empty {
            return Ok(dataset);
        }
        let n = self.classes.len();
        for class in 0..n {
            dataset
                .training
                .push(LabeledExample::new(sketch(class, false), class, n)?);
            dataset
                .validation
                .push(LabeledExample::new(sketch(class, false), class, n)?);
        }
        Ok(dataset)
    }
}

pub struct FakeModel {
    classes: Vec<String>,
    predict_gate: Gate,
    input_shape: Option<TensorShape>,
    panics: bool,
}

impl Predictor for FakeModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, inputs: &[Tensor]) -> Vec<Vec<f32>> {
        let n = self.classes.len();
        inputs
            .iter()
            .map(|input| {
                if self.panics {
                    panic!("fake model blew up");
                }
                if self.input_shape.is_some_and(|shape| shape != input.shape()) {
                    return Vec::new();
                }
                let values = input.as_slice();
                if values.get(1).is_some_and(|&slow| slow > 0.5) {
                    self.predict_gate.wait();
                }
                if values.get(2).is_some_and(|&tie| tie > 0.5) {
                    return vec![1.0 / n as f32; n];
                }
                let class = values.first().map_or(0, |&v| v as usize) % n;
                let rest = 0.1 / (n.max(2) - 1) as f32;
                (0..n).map(|i| if i == class { 0.9 } else { rest }).collect()
            })
            .collect()
    }

    fn input_shape(&self) -> Option<TensorShape> {
        self.input_shape
    }
}

impl TrainedModel for FakeModel {
    fn export(&self, _compress: bool) -> Result<Vec<u8>, String> {
        let input_len = self.input_shape.map_or(0, |shape| shape.len());
        Ok(artifact_bytes(input_len, &self.classes))
    }
}

pub struct FakeClassifier {
    classes: Vec<String>,
    metrics: Vec<(usize, usize)>,
    fit_gate: Option<Gate>,
    until_stopped: bool,
    fit_error: Option<String>,
    predict_gate: Gate,
    input_shape: Option<TensorShape>,
    panicking_predict: bool,
    fits: AtomicUsize,
}

impl FakeClassifier {
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            metrics: Vec::new(),
            fit_gate: None,
            until_stopped: false,
            fit_error: None,
            predict_gate: Gate::default(),
            input_shape: None,
            panicking_predict: false,
            fits: AtomicUsize::new(0),
        }
    }

    /// Report these `(epoch, batch)` progress points, in order, during each fit.
    pub fn with_metrics(mut self, points: &[(usize, usize)]) -> Self {
        self.metrics = points.to_vec();
        self
    }

    /// Hold every fit open until `gate` is opened.
    pub fn with_fit_gate(mut self, gate: Gate) -> Self {
        self.fit_gate = Some(gate);
        self
    }

    /// Keep completing epochs until the observer asks to stop.
    pub fn until_stopped(mut self) -> Self {
        self.until_stopped = true;
        self
    }

    pub fn failing_fit(mut self, message: &str) -> Self {
        self.fit_error = Some(message.to_string());
        self
    }

    pub fn with_predict_gate(mut self, gate: Gate) -> Self {
        self.predict_gate = gate;
        self
    }

    /// Fitted models record `shape` and return no distribution for other inputs.
    pub fn with_input_shape(mut self, shape: TensorShape) -> Self {
        self.input_shape = Some(shape);
        self
    }

    /// Models panic inside `predict`.
    pub fn panicking_predict(mut self) -> Self {
        self.panicking_predict = true;
        self
    }

    pub fn fits(&self) -> usize {
        self.fits.load(Ordering::SeqCst)
    }

    fn model(
        &self,
        classes: Vec<String>,
        input_shape: Option<TensorShape>,
    ) -> Box<dyn TrainedModel> {
        Box::new(FakeModel {
            classes,
            predict_gate: self.predict_gate.clone(),
            input_shape,
            panics: self.panicking_predict,
        })
    }
}

impl Classifier for FakeClassifier {
    fn fit(
        &self,
        _dataset: &Dataset,
        observer: &dyn TrainingObserver,
    ) -> Result<Box<dyn TrainedModel>, String> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fit_error {
            return Err(err.clone());
        }
        for &(epoch, batch) in &self.metrics {
            observer.on_metrics(metrics(epoch, batch));
        }
        if self.until_stopped {
            let mut epoch = 0;
            while !observer.should_stop() && epoch < 5_000 {
                observer.on_epoch_completed(metrics(epoch, 1));
                epoch += 1;
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        if let Some(gate) = &self.fit_gate {
            gate.wait();
        }
        Ok(self.model(self.classes.clone(), self.input_shape))
    }

    fn load(&self, payload: &[u8]) -> Result<Box<dyn TrainedModel>, String> {
        let text = std::str::from_utf8(payload).map_err(|err| err.to_string())?;
        let (input_len, classes) = text
            .strip_prefix(ARTIFACT_PREFIX)
            .and_then(|rest| rest.split_once(':'))
            .ok_or_else(|| "Not a fake model artifact".to_string())?;
        let input_len: usize = input_len.parse().map_err(|_| "Bad input length".to_string())?;
        let input_shape = (input_len > 0).then(|| TensorShape::vector(input_len));
        Ok(self.model(classes.split(',').map(str::to_string).collect(), input_shape))
    }
}

/// Controller over fakes with export-on-complete disabled and no bundled fallbacks.
pub fn controller(
    dataset: &Arc<FakeDataset>,
    classifier: &Arc<FakeClassifier>,
    models_dir: &Path,
) -> ModelLifecycleController {
    controller_with_options(dataset, classifier, models_dir, fake_options())
}

/// No export on completion, `fake` prefix, and imports of any input shape.
pub fn fake_options() -> LifecycleOptions {
    LifecycleOptions {
        export_on_complete: false,
        export_compressed: false,
        export_prefix: "fake".to_string(),
        input_shape: None,
    }
}

pub fn controller_with_options(
    dataset: &Arc<FakeDataset>,
    classifier: &Arc<FakeClassifier>,
    models_dir: &Path,
    options: LifecycleOptions,
) -> ModelLifecycleController {
    let capabilities = Capabilities {
        dataset: dataset.clone(),
        classifier: classifier.clone(),
    };
    let store = ArtifactStore::with_fallbacks(models_dir, Vec::new());
    ModelLifecycleController::new(capabilities, store, options)
}
