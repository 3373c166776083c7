//! The transport boundary
//!
//! HTTP, WebSocket, MQTT and BLE transports all live outside this crate. The
//! client only needs something that can take an outgoing message, deliver it
//! to the device and hand back the raw reply bytes.
//!
//! Transports with a push channel (WebSocket, MQTT) also return a
//! [`NotificationSource`] from [`Transport::notification_source`]. The client
//! checks for it once, when it is built, and feeds every pushed payload into
//! its notification router.

use crate::context::CallContext;
use async_trait::async_trait;
use drpc_core::{codec, AuthData, Id, Request, Result};
use std::sync::Arc;

/// Callback a transport invokes with each pushed payload
pub type NotificationSink = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Message handed to [`Transport::call`]
#[derive(Debug, Clone, Copy)]
pub enum Outgoing<'a> {
    /// One request, or a notification when it has no identifier
    Single(&'a Request),
    /// Several requests sent together as one array
    Batch(&'a [Request]),
}

impl<'a> Outgoing<'a> {
    /// The request, when this is not a batch
    pub fn request(&self) -> Option<&'a Request> {
        match *self {
            Outgoing::Single(req) => Some(req),
            Outgoing::Batch(_) => None,
        }
    }

    /// Every request in this message, in send order
    pub fn requests(&self) -> &'a [Request] {
        match *self {
            Outgoing::Single(req) => std::slice::from_ref(req),
            Outgoing::Batch(reqs) => reqs,
        }
    }

    pub fn method(&self) -> Option<&'a str> {
        self.request().map(|r| r.method.as_str())
    }

    pub fn params(&self) -> Option<&'a serde_json::Value> {
        self.request().and_then(|r| r.params.as_ref())
    }

    pub fn id(&self) -> Option<&'a Id> {
        self.request().and_then(|r| r.id.as_ref())
    }

    pub fn auth(&self) -> Option<&'a AuthData> {
        self.request().and_then(|r| r.auth.as_ref())
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Outgoing::Batch(_))
    }

    /// Whether the device is expected to reply
    pub fn expects_response(&self) -> bool {
        self.requests().iter().any(|r| !r.is_notification())
    }

    /// Wire bytes: an object for a single request, an array for a batch
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Outgoing::Single(req) => codec::encode_request(req),
            Outgoing::Batch(reqs) => codec::encode_batch(reqs),
        }
    }
}

/// Byte-moving collaborator the client sends through
///
/// `call` must honor the context's deadline and cancellation (see
/// [`CallContext::run`]) and report its own failures as
/// `Error::Transport`. The bytes it returns are parsed by the client; for a
/// notification they are ignored and may be empty.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, ctx: &CallContext, outgoing: Outgoing<'_>) -> Result<Vec<u8>>;

    async fn close(&self) -> Result<()>;

    /// Push capability, if this transport has one
    fn notification_source(&self) -> Option<&dyn NotificationSource> {
        None
    }
}

/// Optional push channel of a transport
pub trait NotificationSource: Send + Sync {
    /// Start delivering pushed payloads to `sink`, replacing any previous sink
    fn subscribe(&self, sink: NotificationSink) -> Result<()>;

    /// Stop delivering pushed payloads
    fn unsubscribe(&self) -> Result<()>;
}
