//! Wire types, codec and error model for drpc
//!
//! This crate holds the protocol-level pieces of the device RPC client that do
//! not depend on how bytes are moved:
//!
//! - **Types**: requests, responses, notifications and the normalized [`Id`]
//! - **Codec**: encoding requests and parsing/classifying incoming payloads
//! - **Errors**: the [`Error`] kinds and the error-code classification hook
//! - **Auth**: the authentication block carried inside requests
//! - **Observability**: tracing subscriber and OpenTelemetry bootstrap
//!
//! Devices speak a JSON-RPC 2.0 dialect that is loose in places (the version
//! tag is sometimes missing, identifiers come back in a different numeric
//! representation). The codec accepts those quirks and rejects everything
//! else as a protocol error.
//!
//! # Example
//!
//! ```rust
//! use drpc_core::{codec, Id, Request};
//!
//! let request = Request::new("Switch.GetStatus", Some(serde_json::json!({"id": 0})), Id::from(1u64));
//! let bytes = codec::encode_request(&request).unwrap();
//!
//! let response = codec::parse_response(br#"{"id":1,"result":{"output":true}}"#).unwrap();
//! assert_eq!(response.id, request.id.unwrap());
//! # let _ = bytes;
//! ```

pub mod auth;
pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use auth::{validate_auth_data, AuthData};
pub use error::{
    DomainError, Error, ErrorCodeTable, ErrorObject, Result, RpcError, StandardCode,
    StandardCodes,
};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{
    decode_payload, Id, Message, Notification, Request, Response, JSONRPC_VERSION,
};
