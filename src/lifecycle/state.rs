use std::fmt;

/// Phase of the model lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    BuildingDataset,
    Training,
    Predicting,
    Importing,
}

impl LifecycleState {
    pub fn is_busy(self) -> bool {
        !matches!(self, LifecycleState::Idle)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::BuildingDataset => "building dataset",
            LifecycleState::Training => "training",
            LifecycleState::Predicting => "predicting",
            LifecycleState::Importing => "importing",
        };
        f.write_str(label)
    }
}

/// Readiness flags published with every status snapshot.
///
/// `busy` is true exactly when `state` is not [`LifecycleState::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleStatus {
    pub state: LifecycleState,
    /// A usable model is loaded.
    pub ready: bool,
    pub busy: bool,
}

impl LifecycleStatus {
    pub fn new(state: LifecycleState, ready: bool) -> Self {
        Self {
            state,
            ready,
            busy: state.is_busy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_tracks_non_idle_states() {
        assert!(!LifecycleStatus::new(LifecycleState::Idle, true).busy);
        for state in [
            LifecycleState::BuildingDataset,
            LifecycleState::Training,
            LifecycleState::Predicting,
            LifecycleState::Importing,
        ] {
            assert!(LifecycleStatus::new(state, false).busy, "{state}");
        }
    }
}
