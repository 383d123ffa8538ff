//! Embedded relational persistence for SchedulerGodX (spec.md §4.3, §4.4).

pub mod client_registry;
pub mod store;

pub use client_registry::ClientRegistry;
pub use store::TaskStore;
