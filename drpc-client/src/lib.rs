//! Request/response engine for JSON-RPC device control
//!
//! This crate talks to networked devices (smart relays, dimmers, covers)
//! that speak a JSON-RPC 2.0 dialect with an `auth` block on requests. It
//! owns everything between a typed call and raw bytes; moving the bytes is
//! left to a [`Transport`] supplied by the caller.
//!
//! # Core Features
//!
//! - **Request-Response**: Typed calls with identifier checking
//! - **Batch Requests**: Several calls in one round trip, matched by id
//! - **Notifications**: Pushed device events routed to registered handlers
//! - **Authentication**: Basic and digest (SHA-256 or MD5) auth blocks
//! - **Error Classification**: Device error codes mapped through a table
//! - **Observability**: OpenTelemetry integration for traces and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use drpc_client::{CallContext, Client, Transport};
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(transport: Arc<dyn Transport>) -> drpc_core::Result<()> {
//! let client = Client::new(transport)?;
//!
//! client.on_method("NotifyStatus", |params| {
//!     println!("status changed: {}", params);
//! });
//!
//! let ctx = CallContext::with_timeout(Duration::from_secs(5));
//! let status: serde_json::Value = client
//!     .call(&ctx, "Switch.GetStatus", json!({"id": 0}))
//!     .await?;
//! println!("{}", status);
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod batch;
mod builder;
mod client;
mod client_builder;
mod context;
mod metrics;
mod notification;
mod transport;

pub use auth::{AuthProvider, BasicCredentials, DigestAlgorithm, DigestCredentials};
pub use batch::{Batch, BatchRequest, BatchResult};
pub use builder::RequestBuilder;
pub use client::Client;
pub use client_builder::ClientBuilder;
pub use context::{CallContext, CancelHandle};
pub use metrics::ClientMetrics;
pub use notification::{GlobalHandler, MethodHandler, NotificationRouter};
pub use transport::{NotificationSink, NotificationSource, Outgoing, Transport};
