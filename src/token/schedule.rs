use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use tokio::task::JoinHandle;

struct Armed {
    generation: u64,
    fire_at: Timestamp,
    handle: JoinHandle<()>,
}

/// At most one pending deferred refresh.
///
/// Arming replaces (aborts) whatever was pending. The fired task receives its
/// generation and must call [`RefreshSchedule::release`] before doing work, so
/// that a re-arm issued from inside the task does not abort the task itself.
#[derive(Default)]
pub struct RefreshSchedule {
    slot: Mutex<Option<Armed>>,
    generations: AtomicU64,
}

impl RefreshSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Armed>> {
        // The slot holds no invariant a panicking holder could break.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `task` once after `delay`, cancelling any previously armed task.
    pub fn arm<F, Fut>(&self, delay: Duration, task: F)
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let fire_at = SignedDuration::try_from(delay)
            .ok()
            .and_then(|delay| Timestamp::now().checked_add(delay).ok())
            .unwrap_or(Timestamp::MAX);
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task(generation).await;
        });
        *slot = Some(Armed {
            generation,
            fire_at,
            handle,
        });
    }

    /// Detaches the fired task from the slot. Returns false when the task has
    /// been superseded by a newer arm or a cancel.
    pub fn release(&self, generation: u64) -> bool {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(armed) if armed.generation == generation => {
                slot.take();
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot().is_some()
    }

    pub fn fire_at(&self) -> Option<Timestamp> {
        self.slot().as_ref().map(|armed| armed.fire_at)
    }
}

impl Drop for RefreshSchedule {
    fn drop(&mut self) {
        self.cancel();
    }
}
