//! `Dispatcher` (spec.md §4.7): the protocol state machine invoked for each
//! broker delivery.
//!
//! The Dispatcher itself is stateless beyond the `ClientRegistry` it
//! mirrors in memory; all durable state goes through [`TaskSink`] (wrapping
//! `TaskStore` + `Scheduler`). Acking the delivery is the caller's
//! responsibility (spec.md §4.7 step 1 — "durability is provided by
//! TaskStore", not broker redelivery), so `Dispatcher::dispatch` only ever
//! decodes and reacts; it never touches delivery tags.

use std::sync::Arc;

use scheduler_broker::codec;
use scheduler_shared::domain::{Client, Task, TaskStatus, TaskStatusWire};
use scheduler_shared::envelope::{
    CancelArgs, ErrorArgs, Envelope, InfoArgs, InitializationArgs, MessageType, TaskArgs,
};
use scheduler_shared::error_code::ErrorCode;
use scheduler_store::{ClientRegistry, TaskStore};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ports::{ReplyPort, TaskSink};

/// Invoked by the Scheduler when a task's deadline arrives; runs the
/// Executor and publishes the terminal reply. Boxed so `Dispatcher` stays
/// generic only over `ReplyPort`/`TaskSink`, not over whatever Executor
/// implementation the binary wires in.
pub type FireHandler = Arc<dyn Fn(Task) + Send + Sync>;

pub struct Dispatcher<R: ReplyPort, S: TaskSink> {
    reply_port: Arc<R>,
    task_sink: Arc<S>,
    store: Arc<TaskStore>,
    registry: Mutex<ClientRegistry>,
    on_task_fire: FireHandler,
}

impl<R: ReplyPort, S: TaskSink> Dispatcher<R, S> {
    pub fn new(
        reply_port: Arc<R>,
        task_sink: Arc<S>,
        store: Arc<TaskStore>,
        registry: ClientRegistry,
        on_task_fire: FireHandler,
    ) -> Self {
        Self {
            reply_port,
            task_sink,
            store,
            registry: Mutex::new(registry),
            on_task_fire,
        }
    }

    /// Decodes `body` and dispatches it; step 2 of spec.md §4.7 — a decode
    /// failure is logged and dropped (no reply possible, `id`/`client`
    /// aren't trustworthy).
    pub async fn dispatch(&self, body: &[u8]) {
        let envelope = match codec::decode(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping undecodable delivery");
                return;
            }
        };
        self.dispatch_envelope(envelope).await;
    }

    pub async fn dispatch_envelope(&self, envelope: Envelope) {
        let registered = self.registry.lock().await.contains(&envelope.client);
        if !registered && envelope.message_type != MessageType::Initialization {
            self.reply_error(&envelope, ErrorCode::UnregisteredClient, "client not registered")
                .await;
            return;
        }

        match envelope.message_type {
            MessageType::Initialization => self.handle_initialization(envelope).await,
            MessageType::Info => {
                info!(client = %envelope.client, "received INFO, logging only");
            }
            MessageType::Task => self.handle_task(envelope).await,
            MessageType::Cancel => self.handle_cancel(envelope).await,
            MessageType::Error => {
                info!(client = %envelope.client, "received ERROR envelope from client, logging only");
            }
            MessageType::Unknown(_) => {
                self.reply_error(&envelope, ErrorCode::IncorrectType, "unrecognized message type")
                    .await;
            }
        }
    }

    async fn handle_initialization(&self, envelope: Envelope) {
        let args: Result<InitializationArgs, _> = serde_json::from_value(envelope.arguments.clone());
        let args = match args {
            Ok(args) => args,
            Err(e) => {
                self.reply_error(&envelope, ErrorCode::BadInitialization, &e.to_string())
                    .await;
                return;
            }
        };

        let mut registry = self.registry.lock().await;
        if registry.contains(&envelope.client) {
            drop(registry);
            self.reply_error(
                &envelope,
                ErrorCode::BadInitialization,
                "client already initialized",
            )
            .await;
            return;
        }

        let client = Client {
            name: envelope.client.clone(),
            enable_overdue: args.enable_overdue,
        };
        if let Err(e) = registry.append(&self.store, client).await {
            drop(registry);
            self.reply_error(&envelope, ErrorCode::BadInitialization, &e.to_string())
                .await;
            return;
        }
        drop(registry);
        self.reply_ok(&envelope).await;
    }

    async fn handle_task(&self, envelope: Envelope) {
        match self.build_task(&envelope) {
            Ok(task) => {
                let on_fire = self.on_task_fire.clone();
                let result = self
                    .task_sink
                    .insert_and_arm(task, Box::new(move |task| on_fire(task)))
                    .await;
                match result {
                    Ok(()) => self.reply_ok(&envelope).await,
                    Err(e) => {
                        self.reply_error(&envelope, ErrorCode::InvalidTask, &e.to_string())
                            .await
                    }
                }
            }
            Err(message) => {
                self.reply_error(&envelope, ErrorCode::InvalidTask, &message)
                    .await
            }
        }
    }

    fn build_task(&self, envelope: &Envelope) -> Result<Task, String> {
        let args: TaskArgs =
            serde_json::from_value(envelope.arguments.clone()).map_err(|e| e.to_string())?;

        if args.lifetime < 1 {
            return Err(format!("lifetime must be >= 1, got {}", args.lifetime));
        }

        let function = codec::deserialize(&args.function).map_err(|e| e.to_string())?;
        let handler_id = function
            .get("handler")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "function blob missing handler id".to_string())?
            .to_string();
        let task_args = codec::deserialize(&args.args).map_err(|e| e.to_string())?;
        let kwargs = codec::deserialize(&args.kwargs).map_err(|e| e.to_string())?;
        let time_to_start_raw = codec::deserialize(&args.time_to_start).map_err(|e| e.to_string())?;
        let time_to_start_str = time_to_start_raw
            .as_str()
            .ok_or_else(|| "time_to_start is not a string".to_string())?;
        let time_to_start = chrono::DateTime::parse_from_rfc3339(time_to_start_str)
            .map_err(|e| e.to_string())?
            .with_timezone(&chrono::Utc);

        Ok(Task {
            id: envelope.id.clone(),
            client: envelope.client.clone(),
            handler_id,
            args: task_args,
            kwargs,
            time_to_start,
            lifetime_secs: args.lifetime,
            hard: args.hard,
            status: TaskStatusWire(TaskStatus::Waiting),
        })
    }

    /// CANCEL dispatch (SPEC_FULL.md §4.7.1).
    async fn handle_cancel(&self, envelope: Envelope) {
        let args: CancelArgs = match serde_json::from_value(envelope.arguments.clone()) {
            Ok(args) => args,
            Err(e) => {
                self.reply_error(&envelope, ErrorCode::InvalidTask, &e.to_string())
                    .await;
                return;
            }
        };

        let task = match self.task_sink.lookup(&args.task_id).await {
            Ok(Some(task)) if task.client == envelope.client => task,
            Ok(_) => {
                self.reply_error(&envelope, ErrorCode::InvalidTask, "unknown or unowned task")
                    .await;
                return;
            }
            Err(e) => {
                self.reply_error(&envelope, ErrorCode::InvalidTask, &e.to_string())
                    .await;
                return;
            }
        };

        if task.status.0 != TaskStatus::Waiting {
            self.reply_error(&envelope, ErrorCode::InvalidTask, "task is not WAITING")
                .await;
            return;
        }

        match self.task_sink.cancel(&task).await {
            Ok(()) => self.reply_ok(&envelope).await,
            Err(e) => {
                self.reply_error(&envelope, ErrorCode::InvalidTask, &e.to_string())
                    .await
            }
        }
    }

    async fn reply_ok(&self, envelope: &Envelope) {
        let reply = Envelope::new(
            envelope.id.clone(),
            envelope.client.clone(),
            MessageType::Info,
            serde_json::to_value(InfoArgs::ok()).expect("InfoArgs always serializes"),
        );
        if let Err(e) = self.reply_port.reply(reply).await {
            warn!(error = %e, id = %envelope.id, "failed to publish INFO reply");
        }
    }

    async fn reply_error(&self, envelope: &Envelope, code: ErrorCode, message: &str) {
        let reply = Envelope::new(
            envelope.id.clone(),
            envelope.client.clone(),
            MessageType::Error,
            serde_json::to_value(ErrorArgs {
                error_code: code.as_i32(),
                message: message.to_string(),
            })
            .expect("ErrorArgs always serializes"),
        );
        if let Err(e) = self.reply_port.reply(reply).await {
            warn!(error = %e, id = %envelope.id, "failed to publish ERROR reply");
        }
    }
}
