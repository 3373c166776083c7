//! The device client
//!
//! [`Client`] ties the pieces together: it builds requests, attaches
//! authentication, hands them to the [`Transport`], checks the reply and
//! routes pushed notifications.
//!
//! # Client Lifecycle
//!
//! 1. **Build**: `Client::new(transport)` or [`crate::ClientBuilder`]
//! 2. **Use**: `call`, `notify`, `batch`, register notification handlers
//! 3. **Close**: `close()` detaches from the push channel and closes the
//!    transport; later calls fail with `Error::Closed`
//!
//! # Cloning
//!
//! `Client` is cheaply cloneable using `Arc` internally. All clones share
//! the transport, the identifier counter and the notification handlers, so
//! the client can be used from many tasks at once.

use crate::auth::AuthProvider;
use crate::batch::{self, Batch, BatchRequest, BatchResult};
use crate::builder::RequestBuilder;
use crate::context::CallContext;
use crate::metrics::{error_kind, ClientMetrics};
use crate::notification::NotificationRouter;
use crate::transport::{Outgoing, Transport};
use crate::ClientBuilder;
use drpc_core::{codec, Error, ErrorCodeTable, Request, Response, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// JSON-RPC client for one device
#[derive(Clone)]
pub struct Client {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) requests: Arc<RequestBuilder>,
    pub(crate) router: NotificationRouter,
    pub(crate) auth: Option<Arc<dyn AuthProvider>>,
    pub(crate) error_table: Option<Arc<dyn ErrorCodeTable>>,
    pub(crate) metrics: Option<Arc<ClientMetrics>>,
    /// Set when the transport had a push channel at construction
    pub(crate) push_enabled: bool,
    pub(crate) closed: Arc<AtomicBool>,
}

impl Client {
    /// Client with default options
    ///
    /// Fails only if the transport refuses the notification subscription.
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self> {
        ClientBuilder::new(transport).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder::new(transport)
    }

    /// Call `method` and decode its result
    ///
    /// A device error comes back as `Error::Rpc`, classified when the client
    /// has an error table. An absent result decodes like JSON `null`, so
    /// `()` and `Option<T>` accept it.
    pub async fn call<P, R>(&self, ctx: &CallContext, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let response = self.call_response(ctx, method, params).await?;
        match response.get_result::<R>() {
            Ok(Some(value)) => Ok(value),
            Ok(None) => serde_json::from_value(Value::Null).map_err(|e| {
                Error::Serialization(format!("response has no result: {}", e))
            }),
            Err(e) => Err(self.classify(e)),
        }
    }

    /// Call `method` and return the response as received
    ///
    /// The response identifier must match the request. The one exception is
    /// an error response with a null id, which devices send when they could
    /// not read the request id.
    #[tracing::instrument(skip(self, ctx, params), fields(id))]
    pub async fn call_response<P>(&self, ctx: &CallContext, method: &str, params: P) -> Result<Response>
    where
        P: Serialize,
    {
        self.ensure_open()?;
        let start = Instant::now();

        let outcome = self.round_trip(ctx, method, params).await;

        let duration = start.elapsed().as_secs_f64();
        match &outcome {
            Ok(response) if response.is_error() => {
                self.record_failure(method, duration, "rpc");
                tracing::debug!(error = ?response.error, "Device returned an error");
            }
            Ok(_) => {
                if let Some(ref m) = self.metrics {
                    m.record_call(method, "success", duration);
                }
                tracing::debug!(duration_secs = duration, "Call completed");
            }
            Err(e) => {
                self.record_failure(method, duration, error_kind(e));
                tracing::warn!(error = %e, "Call failed");
            }
        }
        outcome
    }

    async fn round_trip<P: Serialize>(
        &self,
        ctx: &CallContext,
        method: &str,
        params: P,
    ) -> Result<Response> {
        let mut request = self.requests.build(method, params)?;
        self.authorize(&mut request)?;

        let id = request.id.clone().unwrap_or_default();
        tracing::Span::current().record("id", tracing::field::display(&id));

        let bytes = self.transport.call(ctx, Outgoing::Single(&request)).await?;
        let response = codec::parse_response(&bytes)?;

        if response.id != id && !(response.id.is_null() && response.is_error()) {
            return Err(Error::Protocol(format!(
                "response id {} does not match request id {}",
                response.id, id
            )));
        }
        Ok(response)
    }

    /// Send `method` without expecting a reply
    #[tracing::instrument(skip(self, ctx, params))]
    pub async fn notify<P>(&self, ctx: &CallContext, method: &str, params: P) -> Result<()>
    where
        P: Serialize,
    {
        self.ensure_open()?;

        let mut request = self.requests.build_notification(method, params)?;
        self.authorize(&mut request)?;

        // whatever the transport returns for a notification is ignored
        if let Err(e) = self.transport.call(ctx, Outgoing::Single(&request)).await {
            if let Some(ref m) = self.metrics {
                m.record_error(error_kind(&e));
            }
            return Err(e);
        }
        Ok(())
    }

    /// Start an empty batch
    pub fn batch(&self) -> Batch {
        Batch::new(self.clone())
    }

    #[tracing::instrument(skip(self, ctx, entries), fields(batch_size = entries.len()))]
    pub(crate) async fn execute_batch(
        &self,
        ctx: &CallContext,
        entries: &[BatchRequest],
    ) -> Result<Vec<BatchResult>> {
        self.ensure_open()?;
        let start = Instant::now();

        let mut requests = self.requests.build_batch(entries)?;
        for request in &mut requests {
            self.authorize(request)?;
        }
        if let Some(ref m) = self.metrics {
            m.record_batch(requests.len() as u64);
        }

        let responses = match self.send_batch(ctx, &requests).await {
            Ok(responses) => responses,
            Err(e) => {
                let duration = start.elapsed().as_secs_f64();
                self.record_failure("batch", duration, error_kind(&e));
                tracing::warn!(error = %e, "Batch failed");
                return Err(e);
            }
        };

        let results = batch::correlate(&requests, responses, self.error_table.as_deref());

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if let Some(ref m) = self.metrics {
            let status = if failed == 0 { "success" } else { "partial" };
            m.record_call("batch", status, start.elapsed().as_secs_f64());
        }
        tracing::debug!(failed, "Batch completed");

        Ok(results)
    }

    async fn send_batch(&self, ctx: &CallContext, requests: &[Request]) -> Result<Vec<Response>> {
        let bytes = self.transport.call(ctx, Outgoing::Batch(requests)).await?;
        codec::parse_batch_response(&bytes)
    }

    /// Handlers receiving this client's pushed notifications
    pub fn router(&self) -> &NotificationRouter {
        &self.router
    }

    /// Register a handler for every notification
    pub fn on_notification<F>(&self, handler: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.router.on_notification(handler);
    }

    /// Register a handler for notifications of one method
    pub fn on_method<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.router.on_method(method, handler);
    }

    /// Whether the transport pushes notifications to this client
    pub fn supports_notifications(&self) -> bool {
        self.push_enabled
    }

    pub fn request_builder(&self) -> &RequestBuilder {
        &self.requests
    }

    /// Detach from the push channel and close the transport
    ///
    /// Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if self.push_enabled {
            if let Some(source) = self.transport.notification_source() {
                if let Err(e) = source.unsubscribe() {
                    tracing::warn!(error = %e, "Failed to unsubscribe from notifications");
                }
            }
        }

        tracing::info!("Closing client");
        self.transport.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn authorize(&self, request: &mut Request) -> Result<()> {
        if let Some(ref provider) = self.auth {
            request.auth = provider.authenticate(request)?;
        }
        Ok(())
    }

    fn classify(&self, err: Error) -> Error {
        match self.error_table {
            Some(ref table) => err.classify(table.as_ref()),
            None => err,
        }
    }

    fn record_failure(&self, method: &str, duration: f64, kind: &str) {
        if let Some(ref m) = self.metrics {
            m.record_call(method, "error", duration);
            m.record_error(kind);
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("next_id", &self.requests.peek_next())
            .field("push_enabled", &self.push_enabled)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
