//! `ReplyPort` and `TaskSink`: the narrow interfaces that break the
//! Dispatcher <-> ServiceCore <-> Executor cyclic reference (spec.md §9
//! "Cyclic references"). The Dispatcher only ever sees a publish-only view
//! of the broker and an accept-task view of the Scheduler+Store pair; it
//! never holds a concrete `BrokerChannel` or `Scheduler`, so Executor and
//! Scheduler never need to depend back on `scheduler-dispatcher`.

use std::sync::Arc;

use async_trait::async_trait;
use scheduler_broker::BrokerChannel;
use scheduler_shared::domain::{Task, TaskStatus};
use scheduler_shared::envelope::Envelope;
use scheduler_shared::error::DispatchError;
use scheduler_store::TaskStore;
use scheduler_runtime::Scheduler;

/// Publish-only view of [`BrokerChannel`].
#[async_trait]
pub trait ReplyPort: Send + Sync {
    async fn reply(&self, envelope: Envelope) -> Result<(), DispatchError>;
}

#[async_trait]
impl ReplyPort for BrokerChannel {
    async fn reply(&self, envelope: Envelope) -> Result<(), DispatchError> {
        self.publish(&envelope)
            .await
            .map_err(|e| DispatchError::Internal(e.to_string()))
    }
}

/// Accept-task view of `Scheduler` + `TaskStore`, as named in spec.md §9.
#[async_trait]
pub trait TaskSink: Send + Sync {
    /// Persists `task`, then arms it so `on_fire` runs at `task.time_to_start`.
    async fn insert_and_arm(
        &self,
        task: Task,
        on_fire: Box<dyn FnOnce(Task) + Send>,
    ) -> Result<(), DispatchError>;

    async fn lookup(&self, task_id: &str) -> Result<Option<Task>, DispatchError>;

    /// Best-effort timer cancel followed by a `CANCELLED` status write, in
    /// that order (SPEC_FULL.md §4.7.1 step 2).
    async fn cancel(&self, task: &Task) -> Result<(), DispatchError>;
}

/// The production `TaskSink`, wiring a real `TaskStore` and `Scheduler`.
pub struct StoreSchedulerSink {
    store: Arc<TaskStore>,
    scheduler: Arc<Scheduler>,
}

impl StoreSchedulerSink {
    pub fn new(store: Arc<TaskStore>, scheduler: Arc<Scheduler>) -> Self {
        Self { store, scheduler }
    }
}

#[async_trait]
impl TaskSink for StoreSchedulerSink {
    async fn insert_and_arm(
        &self,
        task: Task,
        on_fire: Box<dyn FnOnce(Task) + Send>,
    ) -> Result<(), DispatchError> {
        self.store
            .insert_task(&task)
            .await
            .map_err(|e| DispatchError::InvalidTask(e.to_string()))?;

        let delay = (task.time_to_start - chrono::Utc::now())
            .num_seconds()
            .max(0);
        let fired_task = task.clone();
        self.scheduler
            .schedule(task.id.clone(), delay, move || on_fire(fired_task));
        Ok(())
    }

    async fn lookup(&self, task_id: &str) -> Result<Option<Task>, DispatchError> {
        self.store
            .get_task(task_id)
            .await
            .map_err(|e| DispatchError::Internal(e.to_string()))
    }

    async fn cancel(&self, task: &Task) -> Result<(), DispatchError> {
        self.scheduler.cancel(&task.id);
        self.store
            .update_status(&task.id, TaskStatus::Cancelled)
            .await
            .map_err(|e| DispatchError::Internal(e.to_string()))
    }
}
