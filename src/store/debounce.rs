//! Single-slot debounce primitive for free-text autosave.
//!
//! Each schedule replaces any pending commit; only the most recent one
//! survives the quiet period, so a superseded commit can never double-apply.

use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Debouncer {
    delay: Duration,
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Mutex::new(None),
        }
    }

    /// Schedules `commit` to run after the quiet period, cancelling any
    /// pending commit. Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, commit: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap();
        if let Some(pending) = slot.take() {
            pending.abort();
        }
        let delay = self.delay;
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            commit();
        }));
    }

    /// Drops any pending commit without running it.
    pub fn cancel(&self) {
        if let Some(pending) = self.slot.lock().unwrap().take() {
            pending.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
