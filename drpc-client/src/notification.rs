//! Notification routing for pushed device events
//!
//! Devices push notifications (`NotifyStatus`, `NotifyEvent`, ...) over
//! transports that keep a channel open. The router hands each one to the
//! handlers registered for it.
//!
//! # Dispatch Order
//!
//! For every notification, global handlers run first, then handlers for its
//! exact method name. Within each group handlers run in registration order.
//! Dispatch is synchronous: every handler has returned before `route` does.
//!
//! # Concurrency
//!
//! Registration and dispatch may happen on different threads. Handlers are
//! called from a snapshot taken with the lock released, so a handler can add
//! or remove handlers without deadlocking. Changes made during a dispatch
//! apply to the next one.
//!
//! # Examples
//!
//! ```rust
//! use drpc_client::NotificationRouter;
//!
//! let router = NotificationRouter::new();
//! router.on_method("NotifyStatus", |params| {
//!     println!("status: {}", params);
//! });
//! router.on_notification(|method, _params| {
//!     println!("notification: {}", method);
//! });
//!
//! router
//!     .route_raw(br#"{"jsonrpc":"2.0","method":"NotifyStatus","params":{"ts":1}}"#)
//!     .unwrap();
//! ```

use drpc_core::{codec, Notification, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Handler receiving every notification as `(method, params)`
pub type GlobalHandler = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Handler receiving the params of one method's notifications
pub type MethodHandler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Registry {
    global: Vec<GlobalHandler>,
    by_method: HashMap<String, Vec<MethodHandler>>,
}

/// Registry and dispatcher for notification handlers
///
/// Cloning is cheap; clones share the same handlers.
#[derive(Clone, Default)]
pub struct NotificationRouter {
    registry: Arc<RwLock<Registry>>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every notification; `None` is ignored
    pub fn add_notification_handler(&self, handler: Option<GlobalHandler>) {
        if let Some(handler) = handler {
            self.registry.write().global.push(handler);
        }
    }

    /// Register a handler for one method; `None` or an empty method is ignored
    pub fn add_method_handler(&self, method: impl Into<String>, handler: Option<MethodHandler>) {
        let method = method.into();
        let Some(handler) = handler else {
            return;
        };
        if method.is_empty() {
            return;
        }
        self.registry
            .write()
            .by_method
            .entry(method)
            .or_default()
            .push(handler);
    }

    pub fn on_notification<F>(&self, handler: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.add_notification_handler(Some(Arc::new(handler)));
    }

    pub fn on_method<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.add_method_handler(method, Some(Arc::new(handler)));
    }

    /// Dispatch a parsed notification; `None` does nothing
    pub fn route(&self, notification: Option<&Notification>) {
        let Some(notification) = notification else {
            return;
        };

        let (global, by_method) = {
            let registry = self.registry.read();
            let by_method = registry
                .by_method
                .get(&notification.method)
                .cloned()
                .unwrap_or_default();
            (registry.global.clone(), by_method)
        };

        tracing::trace!(
            method = %notification.method,
            global = global.len(),
            by_method = by_method.len(),
            "Routing notification"
        );

        let params = notification.params.as_ref().unwrap_or(&Value::Null);
        for handler in &global {
            handler(&notification.method, params);
        }
        for handler in &by_method {
            handler(params);
        }
    }

    /// Parse raw bytes and dispatch them
    ///
    /// A payload that does not parse as a notification is returned as an
    /// error and nothing is dispatched.
    pub fn route_raw(&self, data: &[u8]) -> Result<()> {
        let notification = codec::parse_notification(data)?;
        self.route(Some(&notification));
        Ok(())
    }

    pub fn remove_notification_handlers(&self) {
        self.registry.write().global.clear();
    }

    pub fn remove_method_handlers(&self, method: &str) {
        self.registry.write().by_method.remove(method);
    }

    pub fn remove_all_handlers(&self) {
        let mut registry = self.registry.write();
        registry.global.clear();
        registry.by_method.clear();
    }

    /// Whether any handler, global or per-method, is registered
    pub fn has_handlers(&self) -> bool {
        let registry = self.registry.read();
        !registry.global.is_empty() || registry.by_method.values().any(|h| !h.is_empty())
    }

    pub fn has_method_handlers(&self, method: &str) -> bool {
        self.method_handler_count(method) > 0
    }

    pub fn notification_handler_count(&self) -> usize {
        self.registry.read().global.len()
    }

    pub fn method_handler_count(&self, method: &str) -> usize {
        self.registry
            .read()
            .by_method
            .get(method)
            .map_or(0, Vec::len)
    }

    /// Methods with at least one handler, sorted
    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self
            .registry
            .read()
            .by_method
            .iter()
            .filter(|(_, handlers)| !handlers.is_empty())
            .map(|(method, _)| method.clone())
            .collect();
        methods.sort();
        methods
    }
}

impl std::fmt::Debug for NotificationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationRouter")
            .field("global", &self.notification_handler_count())
            .field("methods", &self.registered_methods())
            .finish()
    }
}
