//! `ServiceCore` (spec.md §4.8): startup, recovery, and the consume-loop
//! lifecycle that wires every other component together.
//!
//! Grounded on `tasker-orchestration/src/bin/server.rs`'s bootstrap shape:
//! open stores, recover, start the consume loop, then `tokio::select!` over
//! a shutdown signal with a bounded grace window.

use std::sync::Arc;
use std::time::Duration;

use scheduler_broker::BrokerChannel;
use scheduler_dispatcher::{Dispatcher, FireHandler, StoreSchedulerSink};
use scheduler_runtime::{ExecutionOutcome, Executor, ExecutorConfig, Scheduler};
use scheduler_shared::config::SchedulerConfig;
use scheduler_shared::domain::{Task, TaskStatus};
use scheduler_shared::envelope::{ErrorArgs, Envelope, InfoArgs, MessageType};
use scheduler_shared::error::SchedulerGodXError;
use scheduler_shared::error_code::ErrorCode;
use scheduler_store::{ClientRegistry, TaskStore};
use tracing::{error, info, warn};

use crate::handlers;

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the service until a shutdown signal arrives. Blocks forever absent
/// one (spec.md §4.8 step 3).
pub async fn run(config: SchedulerConfig) -> Result<(), SchedulerGodXError> {
    let store = Arc::new(TaskStore::open(&config.store.database_path).await?);
    let registry = ClientRegistry::load(&store).await?;
    info!("client registry loaded from store");

    let scheduler = Arc::new(Scheduler::new());
    let handler_registry = handlers::default_registry();
    let executor = Arc::new(Executor::new(handler_registry, ExecutorConfig::default()));

    let inbound = Arc::new(
        BrokerChannel::connect(&config.broker, &config.queues.client_to_service).await?,
    );
    let outbound = Arc::new(
        BrokerChannel::connect(&config.broker, &config.queues.service_to_client).await?,
    );

    let on_fire = build_fire_handler(Arc::clone(&executor), Arc::clone(&store), Arc::clone(&outbound));

    launch_unfulfilled_tasks(&store, &registry, &scheduler, on_fire.clone()).await?;
    info!("unfulfilled tasks re-armed from previous run");

    let task_sink = Arc::new(StoreSchedulerSink::new(Arc::clone(&store), Arc::clone(&scheduler)));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&outbound),
        task_sink,
        Arc::clone(&store),
        registry,
        on_fire,
    ));

    let consume_inbound = Arc::clone(&inbound);
    let consume_dispatcher = Arc::clone(&dispatcher);
    let consume_handle = tokio::spawn(async move {
        let inbound = Arc::clone(&consume_inbound);
        consume_inbound
            .consume("schedulergodx-service", move |delivery| {
                let inbound = Arc::clone(&inbound);
                let dispatcher = Arc::clone(&consume_dispatcher);
                tokio::spawn(async move {
                    // Step 1 (spec.md §4.7): ack unconditionally, durability
                    // comes from TaskStore, not broker redelivery.
                    if let Err(e) = inbound.ack(delivery.delivery_tag).await {
                        warn!(error = %e, "failed to ack delivery");
                    }
                    dispatcher.dispatch(&delivery.body).await;
                });
            })
            .await
    });

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .map_err(|e| SchedulerGodXError::Broker(scheduler_shared::error::BrokerError::Unavailable(e.to_string())))?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        result = consume_handle => {
            match result {
                Ok(Ok(())) => warn!("consume loop ended unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "consume loop failed"),
                Err(e) => error!(error = %e, "consume task panicked"),
            }
        }
    }

    match tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, store.close()).await {
        Ok(()) => info!("store closed cleanly"),
        Err(_) => warn!("store close exceeded graceful shutdown timeout"),
    }

    Ok(())
}

/// Builds the callback the Scheduler invokes at a task's deadline: arm the
/// WAITING -> WORK transition (invariant I3), run the Executor in the
/// requested mode, write the terminal status, and publish the terminal
/// reply (spec.md §4.6).
fn build_fire_handler(
    executor: Arc<Executor>,
    store: Arc<TaskStore>,
    outbound: Arc<BrokerChannel>,
) -> FireHandler {
    Arc::new(move |task: Task| {
        let executor = Arc::clone(&executor);
        let store = Arc::clone(&store);
        let outbound = Arc::clone(&outbound);
        tokio::spawn(async move {
            if let Err(e) = store.update_status(&task.id, TaskStatus::Work).await {
                error!(task_id = %task.id, error = %e, "failed to mark task WORK; abandoning run");
                return;
            }

            let outcome = if task.hard {
                executor.run_hard(&task).await
            } else {
                executor.run_soft(&task).await
            };

            let (status, reply) = match outcome {
                Ok(ExecutionOutcome::Completed(_)) => (
                    TaskStatus::Completed,
                    Envelope::new(
                        task.id.clone(),
                        task.client.clone(),
                        MessageType::Info,
                        serde_json::to_value(InfoArgs::ok()).expect("InfoArgs always serializes"),
                    ),
                ),
                Ok(ExecutionOutcome::Timeout) => (
                    TaskStatus::Error,
                    error_reply(&task, ErrorCode::TaskTimeout, "task exceeded its lifetime"),
                ),
                Ok(ExecutionOutcome::Failed(message)) => (
                    TaskStatus::Error,
                    error_reply(&task, ErrorCode::ErrorInTask, &message),
                ),
                Err(e) => (
                    TaskStatus::Error,
                    error_reply(&task, ErrorCode::ErrorInTask, &e.to_string()),
                ),
            };

            if let Err(e) = store.update_status(&task.id, status).await {
                error!(task_id = %task.id, error = %e, "failed to write terminal status");
            }
            if let Err(e) = outbound.publish(&reply).await {
                error!(task_id = %task.id, error = %e, "failed to publish terminal reply");
            }
        });
    })
}

fn error_reply(task: &Task, code: ErrorCode, message: &str) -> Envelope {
    Envelope::new(
        task.id.clone(),
        task.client.clone(),
        MessageType::Error,
        serde_json::to_value(ErrorArgs {
            error_code: code.as_i32(),
            message: message.to_string(),
        })
        .expect("ErrorArgs always serializes"),
    )
}

/// `_launch_unfulfilled_tasks` (spec.md §4.8 step 2): for each unfulfilled
/// row, orphan it if its client vanished, mark it overdue if its client
/// disabled overdue recovery and its deadline already passed, else re-arm
/// it in the Scheduler.
async fn launch_unfulfilled_tasks(
    store: &TaskStore,
    registry: &ClientRegistry,
    scheduler: &Scheduler,
    on_fire: FireHandler,
) -> Result<(), SchedulerGodXError> {
    let unfulfilled = store.get_unfulfilled().await?;
    let now = chrono::Utc::now();

    for task in unfulfilled {
        let Some(client) = registry.get(&task.client) else {
            store.update_status(&task.id, TaskStatus::Orphan).await?;
            continue;
        };

        let overdue = task.time_to_start <= now;
        if overdue && !client.enable_overdue {
            store.update_status(&task.id, TaskStatus::Overdue).await?;
            continue;
        }

        let delay = (task.time_to_start - now).num_seconds().max(0);
        let fire = on_fire.clone();
        let task_for_fire = task.clone();
        scheduler.schedule(task.id.clone(), delay, move || fire(task_for_fire));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_shared::domain::{Client, TaskStatusWire};
    use std::sync::Mutex as StdMutex;

    fn sample_task(
        id: &str,
        client: &str,
        time_to_start: chrono::DateTime<chrono::Utc>,
    ) -> Task {
        Task {
            id: id.to_string(),
            client: client.to_string(),
            handler_id: "noop".to_string(),
            args: serde_json::json!([]),
            kwargs: serde_json::json!({}),
            time_to_start,
            lifetime_secs: 30,
            hard: false,
            status: TaskStatusWire(TaskStatus::Waiting),
        }
    }

    /// Mirrors spec.md §8 scenario 6: a vanished client's task is orphaned,
    /// a client with `enable_overdue=false` leaves a past-due task OVERDUE,
    /// and a client with `enable_overdue=true` has its past-due task
    /// re-armed and fired immediately.
    #[tokio::test]
    async fn launch_unfulfilled_tasks_orphans_overdues_and_rearms() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(&dir.path().join("t.sqlite3")).await.unwrap();

        store
            .add_client(&Client {
                name: "overdue-client".to_string(),
                enable_overdue: false,
            })
            .await
            .unwrap();
        store
            .add_client(&Client {
                name: "rearm-client".to_string(),
                enable_overdue: true,
            })
            .await
            .unwrap();

        let past = chrono::Utc::now() - chrono::Duration::seconds(60);
        store
            .insert_task(&sample_task("orphan1", "missing-client", past))
            .await
            .unwrap();
        store
            .insert_task(&sample_task("overdue1", "overdue-client", past))
            .await
            .unwrap();
        store
            .insert_task(&sample_task("rearm1", "rearm-client", past))
            .await
            .unwrap();

        let registry = ClientRegistry::load(&store).await.unwrap();
        let scheduler = Scheduler::new();

        let fired = Arc::new(StdMutex::new(Vec::new()));
        let fired_handle = Arc::clone(&fired);
        let on_fire: FireHandler = Arc::new(move |task: Task| {
            fired_handle.lock().unwrap().push(task.id.clone());
        });

        launch_unfulfilled_tasks(&store, &registry, &scheduler, on_fire)
            .await
            .unwrap();

        let orphan = store.get_task("orphan1").await.unwrap().unwrap();
        assert_eq!(orphan.status.0, TaskStatus::Orphan);

        let overdue = store.get_task("overdue1").await.unwrap().unwrap();
        assert_eq!(overdue.status.0, TaskStatus::Overdue);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.lock().unwrap().as_slice(), ["rearm1"]);

        // launch_unfulfilled_tasks only arms the timer; the WAITING -> WORK
        // transition happens in build_fire_handler, not here.
        let rearmed = store.get_task("rearm1").await.unwrap().unwrap();
        assert_eq!(rearmed.status.0, TaskStatus::Waiting);
    }
}
