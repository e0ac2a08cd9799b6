//! Training progress and evaluation metrics.

use std::time::Duration;

/// Progress reported by a running fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Zero-based epoch.
    pub epoch: usize,
    /// Batches completed within the epoch.
    pub batch: usize,
    /// Mean training loss over the epoch so far.
    pub loss: f32,
    /// Training accuracy over the epoch so far, in `[0, 1]`.
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
    /// Wall time of the most recent batch.
    pub batch_time: Duration,
}

impl MetricsSnapshot {
    /// Ordering key used to drop stale progress.
    pub fn progress_key(&self) -> (usize, usize) {
        (self.epoch, self.batch)
    }

    /// Headline text, e.g. `Loss: 0.123`.
    pub fn loss_text(&self) -> String {
        format!("Loss: {:.3}", self.loss)
    }

    /// Secondary text; prefers validation accuracy when available.
    pub fn accuracy_text(&self) -> String {
        let accuracy = self.val_accuracy.unwrap_or(self.accuracy);
        format!("Acc.: {:.1} %", accuracy * 100.0)
    }
}

/// Mean categorical cross-entropy of `probs` against class `truth`.
pub fn cross_entropy(probs: &[f32], truth: usize) -> f32 {
    let p = probs.get(truth).copied().unwrap_or(0.0);
    -(p.max(1e-7)).ln()
}

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Out-of-range indices are ignored.
    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| v as u64).sum()
    }

    /// Fraction of entries on the diagonal; `0.0` when empty.
    pub fn accuracy(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.n_classes).map(|k| self.get(k, k) as u64).sum();
        correct as f32 / total as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    (0..cm.n_classes)
        .map(|class_idx| {
            let tp = cm.get(class_idx, class_idx) as f32;
            let support: u32 = (0..cm.n_classes).map(|j| cm.get(class_idx, j)).sum();
            let predicted: u32 = (0..cm.n_classes).map(|i| cm.get(i, class_idx)).sum();
            let fn_ = support as f32 - tp;
            let fp = predicted as f32 - tp;
            PerClassStats {
                precision: if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) },
                recall: if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) },
                support,
            }
        })
        .collect()
}
