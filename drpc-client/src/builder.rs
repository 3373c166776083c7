//! Request construction and identifier allocation
//!
//! Every client owns one [`RequestBuilder`]. Its counter hands out
//! identifiers `1, 2, 3, ...` and is shared by every task using the client:
//! an atomic increment keeps them unique without a lock. Identifiers are
//! never reused, so a late response can never be mistaken for the answer to
//! a newer request.
//!
//! Parameters are encoded to JSON while building, so a value that cannot be
//! serialized fails here, before anything reaches the transport.

use crate::batch::BatchRequest;
use drpc_core::{Error, Id, Request, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Encode method parameters, mapping `null` to "no params"
pub(crate) fn encode_params<P: Serialize>(params: P) -> Result<Option<Value>> {
    match serde_json::to_value(params) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(Error::Serialization(e.to_string())),
    }
}

/// Builds requests with sequential identifiers
#[derive(Debug)]
pub struct RequestBuilder {
    next_id: AtomicU64,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn allocate_id(&self) -> Id {
        Id::from(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Identifier the next built request would get
    pub fn peek_next(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Request with the next identifier
    pub fn build<P: Serialize>(&self, method: impl Into<String>, params: P) -> Result<Request> {
        let params = encode_params(params)?;
        Ok(Request::new(method, params, self.allocate_id()))
    }

    /// Request with a caller-chosen identifier
    pub fn build_with_id<P: Serialize>(
        &self,
        id: Id,
        method: impl Into<String>,
        params: P,
    ) -> Result<Request> {
        let params = encode_params(params)?;
        Ok(Request::new(method, params, id))
    }

    /// Request without an identifier; the device will not reply
    pub fn build_notification<P: Serialize>(
        &self,
        method: impl Into<String>,
        params: P,
    ) -> Result<Request> {
        let params = encode_params(params)?;
        Ok(Request::notification(method, params))
    }

    /// One request per entry, identifiers increasing in entry order
    ///
    /// Fails on the first entry whose parameters could not be encoded.
    pub fn build_batch(&self, entries: &[BatchRequest]) -> Result<Vec<Request>> {
        entries
            .iter()
            .map(|entry| {
                let params = entry.params()?;
                Ok(Request::new(entry.method(), params, self.allocate_id()))
            })
            .collect()
    }

    /// Restart the sequence at 1
    ///
    /// Only for deterministic tests: live clients must never reuse identifiers.
    pub fn reset(&self) {
        self.next_id.store(1, Ordering::Relaxed);
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
