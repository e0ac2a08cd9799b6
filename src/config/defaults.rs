//! Serde default values shared by the settings structs.

pub(super) const MAX_GRID_CELLS: u32 = 256;
pub(super) const MAX_THREAD_WORKERS: usize = 64;

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_false() -> bool {
    false
}

pub(super) fn default_grid_cells() -> u32 {
    28
}

pub(super) fn default_pixel_size() -> u32 {
    8
}

pub(super) fn default_brush_radius() -> f32 {
    0.5
}

pub(super) fn default_debounce_every() -> usize {
    crate::sketch::DEFAULT_DEBOUNCE_EVERY
}

pub(super) fn default_epochs() -> usize {
    40
}

pub(super) fn default_batch_size() -> usize {
    64
}

pub(super) fn default_learning_rate() -> f32 {
    0.05
}

pub(super) fn default_hidden_size() -> usize {
    64
}

pub(super) fn default_accuracy_threshold() -> f32 {
    0.97
}

pub(super) fn default_accuracy_average_count() -> usize {
    3
}

pub(super) fn default_thread_workers() -> usize {
    8
}

pub(super) fn default_metrics_frequency() -> usize {
    30
}

pub(super) fn default_training_seed() -> u64 {
    42
}

pub(super) fn default_training_per_class() -> usize {
    200
}

pub(super) fn default_validation_per_class() -> usize {
    10
}

pub(super) fn default_dataset_seed() -> u64 {
    7
}

pub(super) fn default_min_scale() -> f32 {
    0.2
}

pub(super) fn default_max_scale() -> f32 {
    0.9
}

pub(super) fn default_import_key() -> String {
    crate::artifacts::DEMO_MODEL_KEY.to_string()
}
