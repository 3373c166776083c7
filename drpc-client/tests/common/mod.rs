//! Common test utilities for drpc-client integration tests
//!
//! This module provides a scripted in-memory transport so client behavior can
//! be tested without a device on the network.

#![allow(dead_code)]

use async_trait::async_trait;
use drpc_client::{CallContext, NotificationSink, NotificationSource, Outgoing, Transport};
use drpc_core::{Error, Request, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Handler = Box<dyn Fn(Outgoing<'_>) -> Result<Vec<u8>> + Send + Sync>;

/// Mock transport for client testing
///
/// Every outgoing message is recorded as decoded JSON, then answered by the
/// handler. With [`MockTransport::with_push`] it also exposes a push channel
/// that tests drive through [`MockTransport::push`].
pub struct MockTransport {
    handler: Handler,
    delay: Option<Duration>,
    push_capable: bool,
    sink: Mutex<Option<NotificationSink>>,
    sent: Mutex<Vec<Value>>,
    calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockTransport {
    /// Answer every message with whatever `handler` returns
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(Outgoing<'_>) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            push_capable: false,
            sink: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Answer every message with the same body
    pub fn replying(body: impl Into<String>) -> Self {
        let body = body.into();
        Self::with_handler(move |_| Ok(body.clone().into_bytes()))
    }

    /// Fail every message with a transport error
    pub fn failing(message: &'static str) -> Self {
        Self::with_handler(move |_| Err(Error::Transport(message.to_string())))
    }

    /// Answer each request with `{"echo": <method>}` under its own id
    pub fn echo() -> Self {
        Self::with_handler(|outgoing| {
            let answer = |r: &Request| {
                r.id.as_ref()
                    .map(|id| mock_response(id, json!({"echo": r.method})))
            };
            let body = match outgoing {
                Outgoing::Single(request) => answer(request).unwrap_or(Value::Null),
                Outgoing::Batch(requests) => Value::Array(requests.iter().filter_map(answer).collect()),
            };
            Ok(body.to_string().into_bytes())
        })
    }

    /// Wait this long before answering, honoring the call context
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Expose a push channel
    pub fn with_push(mut self) -> Self {
        self.push_capable = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Deliver a pushed payload; false if nobody is subscribed
    pub fn push(&self, payload: &str) -> bool {
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => {
                sink(payload.as_bytes());
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Every message sent so far, decoded
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    pub fn last_sent(&self) -> Option<Value> {
        self.sent.lock().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, ctx: &CallContext, outgoing: Outgoing<'_>) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let encoded = outgoing.encode()?;
        let value: Value = serde_json::from_slice(&encoded)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.sent.lock().push(value);

        let delay = self.delay;
        ctx.run(async {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            (self.handler)(outgoing)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn notification_source(&self) -> Option<&dyn NotificationSource> {
        if self.push_capable {
            Some(self)
        } else {
            None
        }
    }
}

impl NotificationSource for MockTransport {
    fn subscribe(&self, sink: NotificationSink) -> Result<()> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn unsubscribe(&self) -> Result<()> {
        self.sink.lock().take();
        Ok(())
    }
}

/// Helper to create a mock JSON-RPC response
pub fn mock_response(id: impl serde::Serialize, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

/// Helper to create a mock JSON-RPC error response
pub fn mock_error_response(id: impl serde::Serialize, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Helper to create a mock JSON-RPC notification
pub fn mock_notification(method: &str, params: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use drpc_core::Id;

    #[test]
    fn test_mock_response_format() {
        let response = mock_response(1, json!({"value": 42})).to_string();
        assert!(response.contains("\"jsonrpc\":\"2.0\""));
        assert!(response.contains("\"id\":1"));
        assert!(response.contains("\"result\""));
    }

    #[test]
    fn test_mock_error_response_format() {
        let response = mock_error_response(1, -32601, "Method not found").to_string();
        assert!(response.contains("\"error\""));
        assert!(response.contains("-32601"));
        assert!(response.contains("Method not found"));
    }

    #[test]
    fn test_mock_notification_format() {
        let notification = mock_notification("NotifyStatus", json!({"ts": 1}));
        assert!(notification.contains("\"method\":\"NotifyStatus\""));
        assert!(notification.contains("\"params\""));
        assert!(!notification.contains("\"id\""));
    }

    #[tokio::test]
    async fn test_echo_transport() {
        let transport = MockTransport::echo();
        let request = Request::new("Switch.GetStatus", None, Id::from(4u64));

        let reply = transport
            .call(&CallContext::new(), Outgoing::Single(&request))
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&reply).unwrap();

        assert_eq!(value["id"], 4);
        assert_eq!(value["result"]["echo"], "Switch.GetStatus");
        assert_eq!(transport.call_count(), 1);
        assert_eq!(transport.last_sent().unwrap()["method"], "Switch.GetStatus");
    }
}
