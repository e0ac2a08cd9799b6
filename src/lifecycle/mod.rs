//! Model lifecycle: dataset building, training, prediction and import.
//!
//! [`ModelLifecycleController`] is the single owner of the active model. It runs
//! one operation at a time on background threads and publishes its progress
//! through a [`StatusReader`] that presentation layers observe.

mod controller;
mod errors;
mod jobs;
mod state;
mod status;

pub use controller::{Action, Capabilities, LifecycleOptions, ModelLifecycleController};
pub use errors::LifecycleError;
pub use state::{LifecycleState, LifecycleStatus};
pub use status::{StatusReader, StatusSnapshot, StatusWriter, status_store};
