//! Wire types for device RPC messages
//!
//! Devices speak a loosely conformant JSON-RPC 2.0 dialect. This module holds
//! the message shapes exchanged with them:
//!
//! 1. **Request**: a call that expects a correlated response (or, with no
//!    identifier, a one-way notification to the device)
//! 2. **Response**: the outcome of a request, a result or an error object
//! 3. **Notification**: an unsolicited push from the device, never correlated
//!
//! # Request IDs
//!
//! Identifiers tie a response back to its request. The client issues
//! sequential integers, but firmware and generic decoders do not always echo
//! them back in the same numeric representation (`1` may come back as `1.0`).
//! [`Id`] therefore compares numbers by value, not by representation.

use crate::auth::AuthData;
use crate::error::{Error, ErrorObject, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Protocol version tag carried by every request we emit
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier
///
/// A small tagged union over the scalar shapes an identifier can take on the
/// wire. Serialized untagged, so `Id::from(7u64)` encodes as a bare `7`.
///
/// Equality and hashing normalize numbers: `Id::from(1u64)`, `Id::from(1i64)`
/// and an `Id` decoded from `1.0` are all the same identifier. Strings only
/// match strings, so `"1"` is not equal to `1`.
///
/// # Examples
///
/// ```rust
/// use drpc_core::Id;
///
/// let sent = Id::from(42u64);
/// let echoed: Id = serde_json::from_str("42.0").unwrap();
/// assert_eq!(sent, echoed);
/// assert_ne!(sent, Id::from("42"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Numeric identifier in whatever representation it was decoded with
    Number(serde_json::Number),
    /// String identifier
    String(String),
    /// Explicit `null`, used by peers that could not read the request id
    Null,
}

/// Representation-independent view of an [`Id`] used for `Eq` and `Hash`
#[derive(PartialEq, Eq, Hash)]
enum IdKey<'a> {
    Integer(i128),
    Float(u64),
    String(&'a str),
    Null,
}

// Largest magnitude at which an integral f64 still fits an i128.
const I128_FLOAT_LIMIT: f64 = 1.0e38;

impl Id {
    fn key(&self) -> IdKey<'_> {
        match self {
            Id::Number(n) => {
                if let Some(u) = n.as_u64() {
                    IdKey::Integer(i128::from(u))
                } else if let Some(i) = n.as_i64() {
                    IdKey::Integer(i128::from(i))
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if f.is_finite() && f.fract() == 0.0 && f.abs() < I128_FLOAT_LIMIT {
                        IdKey::Integer(f as i128)
                    } else {
                        IdKey::Float(f.to_bits())
                    }
                }
            }
            Id::String(s) => IdKey::String(s),
            Id::Null => IdKey::Null,
        }
    }

    /// Whether this is the explicit `null` identifier
    pub fn is_null(&self) -> bool {
        matches!(self, Id::Null)
    }

    /// The identifier as an unsigned integer, if it is a whole non-negative number
    pub fn as_u64(&self) -> Option<u64> {
        match self.key() {
            IdKey::Integer(i) => u64::try_from(i).ok(),
            _ => None,
        }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::Null
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{}", n),
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n.into())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n.into())
    }
}

impl From<u32> for Id {
    fn from(n: u32) -> Self {
        Id::Number(n.into())
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Number(n.into())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

/// Outgoing request
///
/// A request without an identifier is a notification to the device: it is
/// sent the same way but never expects a reply. Authentication material, when
/// present, travels inside the request as the `auth` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version, always "2.0" for requests we build
    pub jsonrpc: String,

    /// Correlation identifier, absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    /// Name of the remote method, e.g. "Switch.Set"
    pub method: String,

    /// Method parameters, omitted from the wire when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,

    /// Authentication block for devices with auth enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthData>,
}

impl Request {
    /// Create a request with the given identifier
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>, id: Id) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: method.into(),
            params,
            auth: None,
        }
    }

    /// Create a request that carries no identifier
    pub fn notification(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
            auth: None,
        }
    }

    /// Attach authentication material
    pub fn with_auth(mut self, auth: AuthData) -> Self {
        self.auth = Some(auth);
        self
    }

    /// True iff the request has no identifier
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Response to a request
///
/// Well-formed responses carry exactly one of `result` or `error`. Some
/// firmware omits the version tag, so it is optional here; the codec rejects
/// it only when present with the wrong value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version, tolerated absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,

    /// Identifier of the request this answers
    #[serde(default)]
    pub id: Id,

    /// Success payload; a present `null` stays `Some(Value::Null)`
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<serde_json::Value>,

    /// Failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// Create a successful response
    pub fn success(result: serde_json::Value, id: Id) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(error: ErrorObject, id: Id) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the response carries no error object
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the response carries an error object
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Decode the result payload
    ///
    /// If the error field is set it is returned as [`Error::Rpc`] and the
    /// result field is not looked at. An absent or `null` result is a
    /// successful no-op and yields `Ok(None)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use drpc_core::{Id, Response};
    /// use serde_json::json;
    ///
    /// let resp = Response::success(json!({"was_on": true}), Id::from(1u64));
    /// let value: Option<serde_json::Value> = resp.get_result().unwrap();
    /// assert_eq!(value.unwrap()["was_on"], true);
    /// ```
    pub fn get_result<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if let Some(error) = &self.error {
            return Err(Error::from(error.clone()));
        }
        decode_payload(self.result.as_ref())
    }
}

/// Keep a present field as `Some`, even when it is `null`
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Decode an optional payload, treating absent and `null` as "nothing to decode"
pub fn decode_payload<T: DeserializeOwned>(payload: Option<&serde_json::Value>) -> Result<Option<T>> {
    match payload {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| Error::Serialization(e.to_string())),
    }
}

/// Unsolicited push from a device
///
/// Notifications arrive independently of any request (status changes, events)
/// and are routed by method name. They never carry an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Protocol version, tolerated absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,

    /// Notification name, e.g. "NotifyStatus"
    #[serde(default)]
    pub method: String,

    /// Notification payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            method: method.into(),
            params,
        }
    }
}

/// Structural classification of an incoming payload
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Single response to a request
    Response(Response),
    /// Array of responses, in wire order
    Batch(Vec<Response>),
    /// Unsolicited notification
    Notification(Notification),
}

impl Message {
    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Message::Batch(_))
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, Message::Notification(_))
    }
}
