//! Scheduling and execution for SchedulerGodX (spec.md §4.5, §4.6, and the
//! named-handler registry from SPEC_FULL.md §4.1.1).

pub mod executor;
pub mod handler_registry;
pub mod scheduler;

pub use executor::{run_handler_subprocess_entrypoint, ExecutionOutcome, Executor, ExecutorConfig};
pub use handler_registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use scheduler::Scheduler;
