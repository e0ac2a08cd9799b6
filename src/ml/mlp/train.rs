use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use tracing::{debug, info};

use super::MlpModel;
use super::model::{MODEL_VERSION, softmax_inplace};
use crate::config::TrainingSettings;
use crate::dataset::Dataset;
use crate::ml::metrics::{MetricsSnapshot, cross_entropy};
use crate::ml::{Classifier, TrainedModel, TrainingObserver};
use crate::tensor::argmax;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub hidden_size: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub l2_penalty: f32,
    pub accuracy_threshold: f32,
    pub accuracy_average_count: usize,
    pub kill_on_accuracy: bool,
    pub thread_workers: usize,
    pub metrics_frequency: usize,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self::from(&TrainingSettings::default())
    }
}

impl From<&TrainingSettings> for TrainOptions {
    fn from(settings: &TrainingSettings) -> Self {
        Self {
            hidden_size: settings.hidden_size,
            epochs: settings.epochs,
            batch_size: settings.batch_size,
            learning_rate: settings.learning_rate,
            l2_penalty: 1e-4,
            accuracy_threshold: settings.accuracy_threshold,
            accuracy_average_count: settings.accuracy_average_count,
            kill_on_accuracy: settings.kill_on_accuracy,
            thread_workers: settings.thread_workers,
            metrics_frequency: settings.metrics_frequency,
            seed: settings.seed,
        }
    }
}

/// [`Classifier`] backed by [`train_mlp`].
#[derive(Debug, Clone, Default)]
pub struct MlpClassifier {
    options: TrainOptions,
}

impl MlpClassifier {
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }
}

impl Classifier for MlpClassifier {
    fn fit(
        &self,
        dataset: &Dataset,
        observer: &dyn TrainingObserver,
    ) -> Result<Box<dyn TrainedModel>, String> {
        let model = train_mlp(dataset, &self.options, observer)?;
        Ok(Box::new(model))
    }

    fn load(&self, payload: &[u8]) -> Result<Box<dyn TrainedModel>, String> {
        Ok(Box::new(MlpModel::from_artifact(payload)?))
    }
}

/// Fit a fresh network with mini-batch SGD.
///
/// Batch gradients are split across `thread_workers` scoped threads. Metrics go
/// to `observer` every `metrics_frequency` batches and at each epoch end; the
/// fit ends early once the trailing accuracy average reaches the threshold or
/// the observer asks to stop.
pub fn train_mlp(
    dataset: &Dataset,
    options: &TrainOptions,
    observer: &dyn TrainingObserver,
) -> Result<MlpModel, String> {
    let n_classes = dataset.classes.len();
    if n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    let input_shape = dataset
        .input_shape()
        .ok_or_else(|| "Empty dataset".to_string())?;
    let d = input_shape.len();
    let (train_x, train_y) = flatten_split(&dataset.training, d, n_classes)?;
    let (val_x, val_y) = flatten_split(&dataset.validation, d, n_classes)?;

    let hidden = options.hidden_size.max(1);
    let batch_size = options.batch_size.max(1);
    let metrics_every = options.metrics_frequency.max(1);
    let average_count = options.accuracy_average_count.max(1);
    let (feature_mean, feature_std) = feature_mean_std(&train_x, d);
    let mut rng = StdRng::seed_from_u64(options.seed);

    let mut model = MlpModel {
        model_version: MODEL_VERSION,
        input_shape,
        classes: dataset.classes.clone(),
        hidden_size: hidden,
        weights1: xavier(&mut rng, d, hidden),
        bias1: vec![0.0; hidden],
        weights2: xavier(&mut rng, hidden, n_classes),
        bias2: vec![0.0; n_classes],
        feature_mean,
        feature_std,
    };
    let train_norm: Vec<Vec<f32>> = train_x.iter().map(|x| model.standardize(x)).collect();
    let val_norm: Vec<Vec<f32>> = val_x.iter().map(|x| model.standardize(x)).collect();

    info!(
        "Training MLP: {} examples, {} classes, hidden {}, {} epochs",
        train_norm.len(),
        n_classes,
        hidden,
        options.epochs
    );

    let mut indices: Vec<usize> = (0..train_norm.len()).collect();
    let mut accuracy_history: Vec<f32> = Vec::new();
    let mut last_val: Option<(f32, f32)> = None;
    let mut global_batch = 0usize;

    for epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        let mut loss_sum = 0.0f32;
        let mut correct = 0usize;
        let mut seen = 0usize;
        let mut batch_time = Duration::ZERO;

        for (batch_index, batch) in indices.chunks(batch_size).enumerate() {
            let started = Instant::now();
            let grads = batch_gradients(&model, &train_norm, &train_y, batch, options.thread_workers)?;
            grads.apply(&mut model, options.learning_rate, options.l2_penalty, batch.len());
            batch_time = started.elapsed();

            loss_sum += grads.loss;
            correct += grads.correct;
            seen += batch.len();
            global_batch += 1;
            if global_batch % metrics_every == 0 {
                observer.on_metrics(MetricsSnapshot {
                    epoch,
                    batch: batch_index + 1,
                    loss: loss_sum / seen as f32,
                    accuracy: correct as f32 / seen as f32,
                    val_loss: last_val.map(|(loss, _)| loss),
                    val_accuracy: last_val.map(|(_, acc)| acc),
                    batch_time,
                });
            }
        }

        if !val_norm.is_empty() {
            last_val = Some(evaluate(&model, &val_norm, &val_y));
        }
        let train_accuracy = correct as f32 / seen.max(1) as f32;
        let snapshot = MetricsSnapshot {
            epoch,
            batch: indices.len().div_ceil(batch_size),
            loss: loss_sum / seen.max(1) as f32,
            accuracy: train_accuracy,
            val_loss: last_val.map(|(loss, _)| loss),
            val_accuracy: last_val.map(|(_, acc)| acc),
            batch_time,
        };
        debug!(
            "Epoch {} done: loss {:.4}, acc {:.3}, val {:?}",
            epoch + 1,
            snapshot.loss,
            snapshot.accuracy,
            last_val
        );
        observer.on_epoch_completed(snapshot);

        accuracy_history.push(last_val.map_or(train_accuracy, |(_, acc)| acc));
        if options.kill_on_accuracy && accuracy_history.len() >= average_count {
            let tail = &accuracy_history[accuracy_history.len() - average_count..];
            let average = tail.iter().sum::<f32>() / average_count as f32;
            if average >= options.accuracy_threshold {
                info!(
                    "Accuracy {:.3} reached threshold {:.3} after epoch {}",
                    average,
                    options.accuracy_threshold,
                    epoch + 1
                );
                break;
            }
        }
        if observer.should_stop() {
            info!("Training stopped after epoch {}", epoch + 1);
            break;
        }
    }

    Ok(model)
}

fn flatten_split(
    examples: &[crate::dataset::LabeledExample],
    d: usize,
    n_classes: usize,
) -> Result<(Vec<&[f32]>, Vec<usize>), String> {
    let mut rows = Vec::with_capacity(examples.len());
    let mut targets = Vec::with_capacity(examples.len());
    for (index, example) in examples.iter().enumerate() {
        let data = example.data.as_slice();
        if data.len() != d {
            return Err(format!(
                "Example {index} has {} values (expected {d})",
                data.len()
            ));
        }
        if example.label.as_slice().len() != n_classes {
            return Err(format!("Example {index} label does not match class count"));
        }
        let target = example
            .class_index()
            .ok_or_else(|| format!("Example {index} has no label"))?;
        rows.push(data);
        targets.push(target);
    }
    Ok((rows, targets))
}

fn xavier(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> Vec<f32> {
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    (0..fan_in * fan_out)
        .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * limit)
        .collect()
}

/// Summed gradients and statistics over part of a batch.
struct Gradients {
    d_w1: Vec<f32>,
    d_b1: Vec<f32>,
    d_w2: Vec<f32>,
    d_b2: Vec<f32>,
    loss: f32,
    correct: usize,
}

impl Gradients {
    fn zeros(model: &MlpModel) -> Self {
        Self {
            d_w1: vec![0.0; model.weights1.len()],
            d_b1: vec![0.0; model.bias1.len()],
            d_w2: vec![0.0; model.weights2.len()],
            d_b2: vec![0.0; model.bias2.len()],
            loss: 0.0,
            correct: 0,
        }
    }

    fn merge(&mut self, other: &Gradients) {
        add_into(&mut self.d_w1, &other.d_w1);
        add_into(&mut self.d_b1, &other.d_b1);
        add_into(&mut self.d_w2, &other.d_w2);
        add_into(&mut self.d_b2, &other.d_b2);
        self.loss += other.loss;
        self.correct += other.correct;
    }

    fn apply(&self, model: &mut MlpModel, learning_rate: f32, l2: f32, batch_len: usize) {
        let scale = learning_rate / batch_len.max(1) as f32;
        for (w, g) in model.weights1.iter_mut().zip(&self.d_w1) {
            *w -= scale * (g + l2 * *w);
        }
        for (b, g) in model.bias1.iter_mut().zip(&self.d_b1) {
            *b -= scale * g;
        }
        for (w, g) in model.weights2.iter_mut().zip(&self.d_w2) {
            *w -= scale * (g + l2 * *w);
        }
        for (b, g) in model.bias2.iter_mut().zip(&self.d_b2) {
            *b -= scale * g;
        }
    }
}

fn add_into(acc: &mut [f32], other: &[f32]) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a += b;
    }
}

fn batch_gradients(
    model: &MlpModel,
    rows: &[Vec<f32>],
    targets: &[usize],
    batch: &[usize],
    workers: usize,
) -> Result<Gradients, String> {
    let workers = workers.clamp(1, batch.len().max(1));
    if workers == 1 {
        return Ok(example_gradients(model, rows, targets, batch));
    }
    let chunk = batch.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = batch
            .chunks(chunk)
            .map(|part| scope.spawn(move || example_gradients(model, rows, targets, part)))
            .collect();
        let mut total = Gradients::zeros(model);
        for handle in handles {
            let part = handle
                .join()
                .map_err(|_| "Gradient worker panicked".to_string())?;
            total.merge(&part);
        }
        Ok(total)
    })
}

fn example_gradients(
    model: &MlpModel,
    rows: &[Vec<f32>],
    targets: &[usize],
    part: &[usize],
) -> Gradients {
    let d = model.input_len();
    let hidden = model.hidden_size;
    let n_classes = model.classes.len();
    let mut grads = Gradients::zeros(model);
    let mut hidden_act = vec![0.0f32; hidden];
    let mut logits = vec![0.0f32; n_classes];
    let mut probs = vec![0.0f32; n_classes];
    let mut d_hidden = vec![0.0f32; hidden];

    for &idx in part {
        let x = &rows[idx];
        let y = targets[idx];
        model.forward(x, &mut hidden_act, &mut logits);
        softmax_inplace(&logits, &mut probs);
        grads.loss += cross_entropy(&probs, y);
        if argmax(&probs).map(|(best, _)| best) == Some(y) {
            grads.correct += 1;
        }

        d_hidden.fill(0.0);
        for c in 0..n_classes {
            let dz2 = probs[c] - if c == y { 1.0 } else { 0.0 };
            grads.d_b2[c] += dz2;
            let base = c * hidden;
            for h in 0..hidden {
                grads.d_w2[base + h] += dz2 * hidden_act[h];
                d_hidden[h] += dz2 * model.weights2[base + h];
            }
        }
        for h in 0..hidden {
            if hidden_act[h] <= 0.0 {
                continue;
            }
            grads.d_b1[h] += d_hidden[h];
            let base = h * d;
            for (g, &xi) in grads.d_w1[base..base + d].iter_mut().zip(x) {
                *g += d_hidden[h] * xi;
            }
        }
    }
    grads
}

/// Mean loss and accuracy over standardized rows.
fn evaluate(model: &MlpModel, rows: &[Vec<f32>], targets: &[usize]) -> (f32, f32) {
    let mut hidden_act = vec![0.0f32; model.hidden_size];
    let mut logits = vec![0.0f32; model.classes.len()];
    let mut probs = vec![0.0f32; model.classes.len()];
    let mut loss = 0.0f32;
    let mut correct = 0usize;
    for (x, &y) in rows.iter().zip(targets) {
        model.forward(x, &mut hidden_act, &mut logits);
        softmax_inplace(&logits, &mut probs);
        loss += cross_entropy(&probs, y);
        if argmax(&probs).map(|(best, _)| best) == Some(y) {
            correct += 1;
        }
    }
    let n = rows.len().max(1) as f32;
    (loss / n, correct as f32 / n)
}

fn feature_mean_std(rows: &[&[f32]], d: usize) -> (Vec<f32>, Vec<f32>) {
    let mut mean = vec![0.0f32; d];
    for row in rows {
        add_into(&mut mean, row);
    }
    let n = rows.len().max(1) as f32;
    for v in &mut mean {
        *v /= n;
    }

    let mut var = vec![0.0f32; d];
    for row in rows {
        for i in 0..d {
            let diff = row[i] - mean[i];
            var[i] += diff * diff;
        }
    }
    for v in &mut var {
        *v = (*v / n).sqrt();
    }
    (mean, var)
}
