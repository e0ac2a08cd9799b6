//! Single-writer, many-reader status store.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{LifecycleError, LifecycleStatus};
use crate::ml::{MetricsSnapshot, Prediction};

/// Everything a presentation layer renders about the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub status: LifecycleStatus,
    /// Headline text, e.g. `Loss: 0.123` or a predicted label.
    pub text: String,
    /// Secondary text, e.g. `Acc.: 97.0 %` or `97.0%`.
    pub subtext: String,
    pub prediction: Option<Prediction>,
    pub metrics: Option<MetricsSnapshot>,
    pub last_error: Option<LifecycleError>,
    /// Incremented on every publish.
    pub version: u64,
}

#[derive(Default)]
struct Shared {
    snapshot: Mutex<StatusSnapshot>,
    subscribers: Mutex<Vec<Sender<StatusSnapshot>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create a connected writer/reader pair.
pub fn status_store() -> (StatusWriter, StatusReader) {
    let shared = Arc::new(Shared::default());
    (
        StatusWriter {
            shared: Arc::clone(&shared),
        },
        StatusReader { shared },
    )
}

/// The only handle that can mutate the status.
pub struct StatusWriter {
    shared: Arc<Shared>,
}

impl StatusWriter {
    /// Apply `edit`, bump the version and notify subscribers.
    pub fn update(&self, edit: impl FnOnce(&mut StatusSnapshot)) -> u64 {
        let published = {
            let mut snapshot = lock(&self.shared.snapshot);
            edit(&mut snapshot);
            snapshot.version = snapshot.version.wrapping_add(1);
            snapshot.clone()
        };
        let version = published.version;
        lock(&self.shared.subscribers).retain(|tx| tx.send(published.clone()).is_ok());
        version
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        lock(&self.shared.snapshot).clone()
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read-only view of the status.
#[derive(Clone)]
pub struct StatusReader {
    shared: Arc<Shared>,
}

impl StatusReader {
    pub fn snapshot(&self) -> StatusSnapshot {
        lock(&self.shared.snapshot).clone()
    }

    pub fn version(&self) -> u64 {
        lock(&self.shared.snapshot).version
    }

    /// Receive every snapshot published after this call.
    pub fn subscribe(&self) -> Receiver<StatusSnapshot> {
        let (tx, rx) = mpsc::channel();
        lock(&self.shared.subscribers).push(tx);
        rx
    }
}
