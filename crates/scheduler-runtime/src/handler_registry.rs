//! Named-handler registry (SPEC_FULL.md §4.1.1 SUPPLEMENT).
//!
//! Replaces the original Python service's `dill.dumps(func)` arbitrary
//! callable serialization (`original_source/schedulergodx/utils/message.py`)
//! with a lookup by a fixed `handler_id` string — the REDESIGN FLAG in
//! spec.md §9 calling out arbitrary pickled-code execution as a security
//! liability is addressed by construction: a submitted TASK can only ever
//! invoke a handler the service operator registered ahead of time.

use std::collections::HashMap;
use std::sync::Arc;

use scheduler_shared::error::ExecutorError;

pub type Handler =
    Arc<dyn Fn(serde_json::Value, serde_json::Value) -> Result<serde_json::Value, String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<HashMap<String, Handler>>,
}

pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<F>(mut self, handler_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(serde_json::Value, serde_json::Value) -> Result<serde_json::Value, String>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(handler_id.into(), Arc::new(handler));
        self
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: Arc::new(self.handlers),
        }
    }
}

impl HandlerRegistry {
    pub fn get(&self, handler_id: &str) -> Result<Handler, ExecutorError> {
        self.handlers
            .get(handler_id)
            .cloned()
            .ok_or_else(|| ExecutorError::UnknownHandler(handler_id.to_string()))
    }

    pub fn contains(&self, handler_id: &str) -> bool {
        self.handlers.contains_key(handler_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_handler_is_invocable_by_id() {
        let registry = HandlerRegistryBuilder::new()
            .register("echo", |args, _kwargs| Ok(args))
            .build();

        let handler = registry.get("echo").unwrap();
        let result = handler(serde_json::json!("hi"), serde_json::json!({})).unwrap();
        assert_eq!(result, serde_json::json!("hi"));
    }

    #[test]
    fn unregistered_handler_id_is_rejected() {
        let registry = HandlerRegistryBuilder::new().build();
        assert!(matches!(
            registry.get("missing"),
            Err(ExecutorError::UnknownHandler(_))
        ));
    }
}
