//! Request method registry and dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pilot_protocol::{DispatchError, SharedSession};
use serde_json::Value;
use tracing::warn;

use crate::dispatch::context::DispatchContext;
use crate::metrics;

/// Requests slower than this are logged.
const SLOW_REQUEST: Duration = Duration::from_secs(5);

/// Implemented by every request method handler.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle the request's `data` sent on `session`. `Ok` becomes the
    /// success payload, `Err` an error response.
    async fn handle(
        &self,
        data: Value,
        session: &SharedSession,
        ctx: &DispatchContext,
    ) -> Result<Value, DispatchError>;
}

/// Maps method names to request handlers.
pub struct RequestRegistry {
    handlers: HashMap<String, Arc<dyn RequestHandler>>,
}

impl RequestRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for `method`.
    pub fn register(&mut self, method: &str, handler: impl RequestHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Run the handler for `method`.
    pub async fn dispatch(
        &self,
        method: &str,
        data: Value,
        session: &SharedSession,
        ctx: &DispatchContext,
    ) -> Result<Value, DispatchError> {
        let Some(handler) = self.handlers.get(method) else {
            metrics::record_request(method, false);
            return Err(DispatchError::UnknownMethod(method.to_owned()));
        };
        metrics::record_request(method, true);

        let start = Instant::now();
        let result = handler.handle(data, session, ctx).await;
        let elapsed = start.elapsed();
        metrics::record_request_duration(method, elapsed);
        if elapsed >= SLOW_REQUEST {
            warn!(
                parent: &ctx.span,
                method,
                duration_secs = elapsed.as_secs_f64(),
                "slow request"
            );
        }
        result
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `method` has a handler.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}
