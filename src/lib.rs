//! Library exports for the shape-sketch app, its tools, benchmarks and tests.
/// Application directory helpers.
pub mod app_dirs;
/// Model artifact storage.
pub mod artifacts;
/// TOML-backed settings.
pub mod config;
/// Labeled training data.
pub mod dataset;
/// egui front-end.
pub mod egui_app;
/// Model lifecycle state machine.
pub mod lifecycle;
/// Tracing setup.
pub mod logging;
/// Classifier capabilities and the MLP implementation.
pub mod ml;
/// Stroke capture, rasterization and debouncing.
pub mod sketch;
/// Fixed-shape tensors.
pub mod tensor;
