//! SchedulerGodX: a broker-fed distributed task-execution service.
//!
//! This crate hosts `ServiceCore`'s startup/recovery/shutdown orchestration
//! (see [`service_core`]) and the default [`handlers`] registry; the
//! protocol, persistence, scheduling, and execution logic live in their own
//! crates under `crates/`.

pub mod handlers;
pub mod service_core;
