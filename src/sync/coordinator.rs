use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// Single-slot gate: at most one run holds it at a time.
#[derive(Clone, Default)]
pub struct RunCoordinator {
    slot: Arc<Mutex<Option<DateTime<Utc>>>>,
}

/// Holding this keeps the slot taken; dropping it frees the slot on any exit path.
pub struct RunGuard {
    slot: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }
}

impl RunCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the slot, or returns None when a run is already active.
    pub fn try_acquire(&self) -> Option<RunGuard> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return None;
        }
        *slot = Some(Utc::now());
        Some(RunGuard { slot: self.slot.clone() })
    }

    pub fn is_running(&self) -> bool {
        self.started_at().is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        *self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
