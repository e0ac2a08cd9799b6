use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::*;
use crate::sketch::{Brush, GridSize, Normalization, Rasterizer};

/// Application settings persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub canvas: CanvasSettings,
    #[serde(default)]
    pub sketch: SketchSettings,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub model: ModelSettings,
}

impl AppConfig {
    /// Clamp values into ranges the pipeline can work with.
    pub fn normalized(mut self) -> Self {
        let canvas = &mut self.canvas;
        canvas.grid_rows = canvas.grid_rows.clamp(1, MAX_GRID_CELLS);
        canvas.grid_columns = canvas.grid_columns.clamp(1, MAX_GRID_CELLS);
        canvas.pixel_size = canvas.pixel_size.max(1);
        if !canvas.brush_radius.is_finite() {
            canvas.brush_radius = default_brush_radius();
        }
        canvas.brush_radius = canvas.brush_radius.clamp(0.0, 8.0);

        self.sketch.debounce_every = self.sketch.debounce_every.max(1);

        let training = &mut self.training;
        training.epochs = training.epochs.max(1);
        training.batch_size = training.batch_size.max(1);
        training.hidden_size = training.hidden_size.max(1);
        training.thread_workers = training.thread_workers.clamp(1, MAX_THREAD_WORKERS);
        training.metrics_frequency = training.metrics_frequency.max(1);
        training.accuracy_average_count = training.accuracy_average_count.max(1);
        if !training.learning_rate.is_finite() || training.learning_rate <= 0.0 {
            training.learning_rate = default_learning_rate();
        }
        if !training.accuracy_threshold.is_finite() {
            training.accuracy_threshold = default_accuracy_threshold();
        }
        training.accuracy_threshold = training.accuracy_threshold.clamp(0.0, 1.0);

        let dataset = &mut self.dataset;
        dataset.training_per_class = dataset.training_per_class.max(1);
        let (lo, hi) = (dataset.min_scale, dataset.max_scale);
        if !(lo.is_finite() && hi.is_finite() && 0.0 < lo && lo <= hi && hi <= 1.0) {
            dataset.min_scale = default_min_scale();
            dataset.max_scale = default_max_scale();
        }
        if self.model.import_key.trim().is_empty() {
            self.model.import_key = default_import_key();
        }
        self
    }
}

/// Drawing grid and rasterization preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSettings {
    #[serde(default = "default_grid_cells")]
    pub grid_rows: u32,
    #[serde(default = "default_grid_cells")]
    pub grid_columns: u32,
    /// On-screen points per grid cell.
    #[serde(default = "default_pixel_size")]
    pub pixel_size: u32,
    /// Brush radius in grid cells.
    #[serde(default = "default_brush_radius")]
    pub brush_radius: f32,
    #[serde(default = "default_false")]
    pub soft_brush: bool,
    #[serde(default)]
    pub normalization: Normalization,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            grid_rows: default_grid_cells(),
            grid_columns: default_grid_cells(),
            pixel_size: default_pixel_size(),
            brush_radius: default_brush_radius(),
            soft_brush: default_false(),
            normalization: Normalization::default(),
        }
    }
}

impl CanvasSettings {
    pub fn grid(&self) -> GridSize {
        GridSize::new(self.grid_rows, self.grid_columns)
    }

    pub fn rasterizer(&self) -> Rasterizer {
        Rasterizer::new(
            Brush {
                radius: self.brush_radius,
                soft: self.soft_brush,
            },
            self.normalization,
        )
    }
}

/// Debounce behavior between the canvas and the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchSettings {
    /// Raw canvas updates coalesced into one prediction request.
    #[serde(default = "default_debounce_every")]
    pub debounce_every: usize,
    #[serde(default = "default_true")]
    pub flush_on_stroke_end: bool,
}

impl Default for SketchSettings {
    fn default() -> Self {
        Self {
            debounce_every: default_debounce_every(),
            flush_on_stroke_end: default_true(),
        }
    }
}

/// Classifier training preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    /// Accuracy that ends training early when `kill_on_accuracy` is set.
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold: f32,
    /// Number of trailing epochs averaged before comparing to the threshold.
    #[serde(default = "default_accuracy_average_count")]
    pub accuracy_average_count: usize,
    #[serde(default = "default_true")]
    pub kill_on_accuracy: bool,
    /// Parallel gradient workers per batch.
    #[serde(default = "default_thread_workers")]
    pub thread_workers: usize,
    /// Publish metrics every this many batches.
    #[serde(default = "default_metrics_frequency")]
    pub metrics_frequency: usize,
    #[serde(default = "default_training_seed")]
    pub seed: u64,
    /// Write the trained model to the models directory.
    #[serde(default = "default_true")]
    pub export_on_complete: bool,
    #[serde(default = "default_true")]
    pub export_compressed: bool,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            hidden_size: default_hidden_size(),
            accuracy_threshold: default_accuracy_threshold(),
            accuracy_average_count: default_accuracy_average_count(),
            kill_on_accuracy: default_true(),
            thread_workers: default_thread_workers(),
            metrics_frequency: default_metrics_frequency(),
            seed: default_training_seed(),
            export_on_complete: default_true(),
            export_compressed: default_true(),
        }
    }
}

/// Generated shape dataset preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    #[serde(default = "default_training_per_class")]
    pub training_per_class: usize,
    #[serde(default = "default_validation_per_class")]
    pub validation_per_class: usize,
    #[serde(default = "default_dataset_seed")]
    pub seed: u64,
    /// Smallest shape size as a fraction of the canvas.
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            training_per_class: default_training_per_class(),
            validation_per_class: default_validation_per_class(),
            seed: default_dataset_seed(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

/// Model artifact preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Artifact key loaded by the import action.
    #[serde(default = "default_import_key")]
    pub import_key: String,
    /// Override for the models directory (defaults to `<app root>/models`).
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            import_key: default_import_key(),
            models_dir: None,
        }
    }
}
