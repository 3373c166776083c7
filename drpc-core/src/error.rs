//! Error types for drpc
//!
//! Two layers of errors live here:
//!
//! - **Error**: everything an operation can fail with, from encoding the
//!   parameters to a server-side rejection (uses thiserror)
//! - **ErrorObject**: the wire-format error a device returns inside a response
//!
//! # Error Kinds
//!
//! - `Serialization`: parameters or results could not be encoded/decoded
//! - `Transport`: surfaced verbatim from the transport collaborator
//! - `Protocol`: malformed payload, wrong version tag, missing field
//! - `Rpc`: the device answered with an error object
//! - `MissingResponse`: a batch slot had no response with its identifier
//! - `Config`: the client could not be set up
//!
//! # Classification
//!
//! Device firmware reports failures as numeric codes. Turning a code into a
//! domain error ("not found", "authentication required") is the job of an
//! external catalog. The core only exposes the hook: an [`ErrorCodeTable`] is
//! consulted and the resulting domain error becomes the
//! [`std::error::Error::source`] of the [`RpcError`].
//!
//! ```rust
//! use drpc_core::{Error, ErrorObject, StandardCode, StandardCodes};
//!
//! let err = Error::from(ErrorObject::method_not_found("Foo.Bar")).classify(&StandardCodes);
//! assert_eq!(err.domain::<StandardCode>(), Some(&StandardCode::MethodNotFound));
//! ```

use crate::types::Id;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for drpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Domain error produced by an [`ErrorCodeTable`]
pub type DomainError = Arc<dyn std::error::Error + Send + Sync>;

/// Error type for drpc operations
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Parameters could not be encoded, or a payload could not be decoded
    /// into the requested type. Encoding failures happen before any I/O.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the transport, passed through untouched
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload did not follow the wire protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Error object returned by the device
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// No response in a batch carried the identifier of this request
    #[error("No response for request id {id}")]
    MissingResponse {
        /// Identifier that went unanswered
        id: Id,
    },

    /// Authentication material is incomplete
    #[error("Invalid auth data: {0}")]
    InvalidAuth(String),

    /// The call deadline passed before the transport returned
    #[error("Request timeout")]
    Timeout,

    /// The call was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// The client was closed
    #[error("Client closed")]
    Closed,

    /// Client setup failed, e.g. the observability bootstrap
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Numeric code of the device error, if this is an RPC error
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            Error::Rpc(rpc) => Some(rpc.object.code),
            _ => None,
        }
    }

    /// Classify an RPC error with the given table; other errors pass through
    pub fn classify(self, table: &dyn ErrorCodeTable) -> Self {
        match self {
            Error::Rpc(rpc) => Error::Rpc(rpc.classify(table)),
            other => other,
        }
    }

    /// The classified domain error, downcast to `K`
    pub fn domain<K: std::error::Error + 'static>(&self) -> Option<&K> {
        match self {
            Error::Rpc(rpc) => rpc.domain(),
            _ => None,
        }
    }

    pub fn is_missing_response(&self) -> bool {
        matches!(self, Error::MissingResponse { .. })
    }
}

impl From<ErrorObject> for Error {
    fn from(object: ErrorObject) -> Self {
        Error::Rpc(RpcError::new(object))
    }
}

/// Error object as it appears in the `error` field of a response
///
/// # Examples
///
/// ```rust
/// use drpc_core::ErrorObject;
/// use serde_json::json;
///
/// let error = ErrorObject::with_data(-105, "Argument 'id', value 3 not found!", json!({"id": 3}));
/// assert_eq!(error.code, -105);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Numeric error code
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Optional auxiliary data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorObject {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Invalid request (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(-32600, msg)
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Invalid params (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(-32602, msg)
    }

    /// Internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(-32603, msg)
    }

    /// Look the code up in a classification table
    pub fn classify(&self, table: &dyn ErrorCodeTable) -> Option<DomainError> {
        table.classify(self.code)
    }
}

impl std::fmt::Display for ErrorObject {
    /// Formats as "[code] message"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Device error carried as a typed value
///
/// Once classified, the domain error is reachable through
/// [`std::error::Error::source`] or [`RpcError::domain`].
#[derive(Debug, Clone)]
pub struct RpcError {
    /// The error object as received
    pub object: ErrorObject,
    domain: Option<DomainError>,
}

impl RpcError {
    pub fn new(object: ErrorObject) -> Self {
        Self {
            object,
            domain: None,
        }
    }

    /// Attach the domain error the table maps this code to, if any
    pub fn classify(mut self, table: &dyn ErrorCodeTable) -> Self {
        self.domain = self.object.classify(table);
        self
    }

    pub fn code(&self) -> i32 {
        self.object.code
    }

    pub fn message(&self) -> &str {
        &self.object.message
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.object.data.as_ref()
    }

    pub fn is_classified(&self) -> bool {
        self.domain.is_some()
    }

    /// The classified domain error, downcast to `K`
    pub fn domain<K: std::error::Error + 'static>(&self) -> Option<&K> {
        self.domain.as_deref()?.downcast_ref::<K>()
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.object.fmt(f)
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.domain
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Lookup from numeric error code to a domain error
///
/// Implemented by the higher-level error catalog; closures work too:
///
/// ```rust
/// use drpc_core::{DomainError, ErrorCodeTable, ErrorObject};
/// use std::sync::Arc;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("not found")]
/// struct NotFound;
///
/// let table = |code: i32| -> Option<DomainError> {
///     (code == -105).then(|| Arc::new(NotFound) as DomainError)
/// };
/// assert!(ErrorObject::new(-105, "missing").classify(&table).is_some());
/// ```
pub trait ErrorCodeTable: Send + Sync {
    fn classify(&self, code: i32) -> Option<DomainError>;
}

impl<F> ErrorCodeTable for F
where
    F: Fn(i32) -> Option<DomainError> + Send + Sync,
{
    fn classify(&self, code: i32) -> Option<DomainError> {
        self(code)
    }
}

/// Kinds behind the codes reserved by JSON-RPC 2.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StandardCode {
    #[error("parse error")]
    ParseError,
    #[error("invalid request")]
    InvalidRequest,
    #[error("method not found")]
    MethodNotFound,
    #[error("invalid params")]
    InvalidParams,
    #[error("internal error")]
    InternalError,
    /// -32000 to -32099, implementation-defined server errors
    #[error("server error {0}")]
    ServerError(i32),
}

/// Table covering only the reserved JSON-RPC 2.0 codes
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodes;

impl ErrorCodeTable for StandardCodes {
    fn classify(&self, code: i32) -> Option<DomainError> {
        let kind = match code {
            -32700 => StandardCode::ParseError,
            -32600 => StandardCode::InvalidRequest,
            -32601 => StandardCode::MethodNotFound,
            -32602 => StandardCode::InvalidParams,
            -32603 => StandardCode::InternalError,
            -32099..=-32000 => StandardCode::ServerError(code),
            _ => return None,
        };
        Some(Arc::new(kind))
    }
}
