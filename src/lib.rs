//! DRPC - JSON-RPC device control
//!
//! This is the main convenience crate that re-exports all DRPC sub-crates.
//! Use this crate if you want a single dependency for talking to devices.
//!
//! # Architecture
//!
//! DRPC is organized into modular crates:
//!
//! - **drpc-core**: Wire types, codec, error handling, auth data, observability
//! - **drpc-client**: Client, batches, notification routing, authentication
//!
//! Transports (HTTP, WebSocket, MQTT, BLE) are not part of DRPC. Implement
//! [`Transport`] for whatever carries bytes to your device.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use drpc::{CallContext, Client, Transport};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example(transport: Arc<dyn Transport>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder(transport)
//!     .with_basic_auth("admin", "secret")
//!     .build()?;
//!
//! let mut batch = client.batch();
//! batch
//!     .add("Switch.GetStatus", json!({"id": 0}))
//!     .add("Cover.GetStatus", json!({"id": 0}));
//!
//! for result in batch.execute(&CallContext::new()).await? {
//!     println!("{}: {:?}", result.method(), result.result());
//! }
//! # Ok(())
//! # }
//! ```

// Re-export all public APIs from sub-crates
pub use drpc_client as client;
pub use drpc_core as core;

// Convenience re-exports of the most commonly used types
pub use drpc_client::{Batch, BatchResult, CallContext, Client, ClientBuilder, Transport};
pub use drpc_core::{Error, Result};
