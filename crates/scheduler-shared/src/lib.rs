//! Shared envelope, domain, config, logging, and error types for
//! SchedulerGodX, used by every other crate in the workspace.

pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod error_code;
pub mod id;
pub mod logging;

pub use config::SchedulerConfig;
pub use domain::{Client, Task, TaskStatus};
pub use envelope::{CancelArgs, Envelope, ErrorArgs, InfoArgs, InitializationArgs, MessageType, TaskArgs};
pub use error::{
    BrokerError, CodecError, DispatchError, ExecutorError, SchedulerError, SchedulerGodXError,
    StoreError,
};
pub use error_code::ErrorCode;
pub use id::new_id;
