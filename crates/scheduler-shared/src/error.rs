//! Per-component error enums and the top-level error they fold into
//! (SPEC_FULL.md §12).
//!
//! Each downstream crate (`scheduler-broker`, `scheduler-store`,
//! `scheduler-runtime`, `scheduler-dispatcher`) owns the operations that
//! produce these variants, but the enums themselves live here so that
//! `SchedulerGodXError` can fold them with `#[from]` without creating a
//! dependency cycle back from `scheduler-shared` into its consumers — the
//! same flattening `tasker-shared`'s `MessagingError` ->
//! `TaskerError::MessagingError(String)` pattern achieves, just declared at
//! the shared root instead of re-wrapped at the boundary.

use thiserror::Error;

/// Envelope/argument decode-encode failures (spec.md §4.1, §7).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error("malformed base64 payload in field {field}: {source}")]
    MalformedBase64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error("object is not serializable by this codec: {0}")]
    Unserializable(String),
    #[error("failed to deserialize payload: {0}")]
    Deserialize(String),
}

/// Broker transport failures (spec.md §7 "BrokerUnavailable at startup").
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("consume failed: {0}")]
    Consume(String),
    #[error("reply correlation timed out waiting for id {0}")]
    ReplyTimeout(String),
}

/// Persistence failures (spec.md §7 "store open failure",
/// "transient store errors").
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),
}

/// Scheduling failures (timer arm/cancel).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("task {0} is not armed")]
    NotArmed(String),
    #[error("task {0} already fired")]
    AlreadyFired(String),
}

/// Execution failures (spec.md §6 `ERROR_IN_TASK`, `TASK_TIMEOUT`).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("handler {0} is not registered")]
    UnknownHandler(String),
    #[error("task exceeded its lifetime of {0}s")]
    Timeout(i64),
    #[error("handler raised an error: {0}")]
    HandlerFailed(String),
    #[error("subprocess execution failed: {0}")]
    Subprocess(String),
}

/// Dispatch/protocol failures (spec.md §6 `INCORRECT_TYPE`,
/// `UNREGISTERED_CLIENT`, `INVALID_TASK`, `BAD_INITIALIZATION`).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("incorrect type")]
    IncorrectType,
    #[error("unregistered client: {0}")]
    UnregisteredClient(String),
    #[error("invalid task: {0}")]
    InvalidTask(String),
    #[error("bad initialization: {0}")]
    BadInitialization(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

/// Top-level error the `schedulergodx-service` binary matches on.
#[derive(Debug, Error)]
pub enum SchedulerGodXError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
