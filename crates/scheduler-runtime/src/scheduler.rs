//! `Scheduler` (spec.md §4.5): fires an activation callback at or after a
//! task's `time_to_start`.
//!
//! Grounded on the timer pattern in
//! `other_examples/..._layer4-src-scheduler.rs` (`tokio::time`-driven
//! deadlines), but tracked with a `DashMap<TaskId, CancellationToken>`
//! rather than a binary heap: spec.md §5 requires no global ordering beyond
//! each task's own deadline, and the number of concurrently armed timers is
//! one per outstanding task, so a heap's head-of-line ordering buys nothing
//! here.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// ARMED -> FIRED or ARMED -> CANCELLED (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Armed,
    Fired,
    Cancelled,
}

pub struct Scheduler {
    timers: Arc<DashMap<String, CancellationToken>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Arms a one-shot timer for `task_id`. `delay_seconds <= 0` fires on
    /// the next tick. At-most-once firing per call (spec.md §4.5 Guarantee).
    pub fn schedule<F>(&self, task_id: impl Into<String>, delay_seconds: i64, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task_id = task_id.into();
        let token = CancellationToken::new();
        self.timers.insert(task_id.clone(), token.clone());

        let timers = Arc::clone(&self.timers);
        let delay = Duration::from_secs(delay_seconds.max(0) as u64);
        let fire_id = task_id.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    timers.remove(&fire_id);
                    trace!(task_id = %fire_id, "scheduler timer fired");
                    on_fire();
                }
                _ = token.cancelled() => {
                    debug!(task_id = %fire_id, "scheduler timer cancelled before firing");
                }
            }
        });
    }

    /// Best-effort cancel; a no-op if the timer already fired (spec.md
    /// §4.5).
    pub fn cancel(&self, task_id: &str) -> bool {
        match self.timers.remove(task_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, task_id: &str) -> bool {
        self.timers.contains_key(task_id)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
