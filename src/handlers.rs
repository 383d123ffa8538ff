//! Built-in handlers registered with every `HandlerRegistry` the service
//! starts up with. Operators extend this list to expose their own callables
//! by name — see `scheduler_runtime::handler_registry` for the registration
//! API the named-handler redesign (SPEC_FULL.md §4.1.1) is built on.

use scheduler_runtime::{HandlerRegistry, HandlerRegistryBuilder};

pub fn default_registry() -> HandlerRegistry {
    HandlerRegistryBuilder::new()
        .register("noop", |_args, _kwargs| Ok(serde_json::Value::Null))
        .register("echo", |args, _kwargs| Ok(args))
        .build()
}
