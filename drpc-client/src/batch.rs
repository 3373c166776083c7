//! Batched calls with per-slot results
//!
//! A batch sends several requests as one wire array. Devices may answer in
//! any order, and may leave some requests unanswered, so results are matched
//! back by identifier and returned in the order the calls were added.
//!
//! # Failure Isolation
//!
//! - A transport failure, or a reply that is not a valid array, fails the
//!   whole batch
//! - A device error for one call stays in that call's slot
//! - A call with no matching response gets `Error::MissingResponse` in its slot
//!
//! # Examples
//!
//! ```rust,no_run
//! use drpc_client::{CallContext, Client};
//! use serde_json::json;
//!
//! # async fn example(client: &Client) -> drpc_core::Result<()> {
//! let mut batch = client.batch();
//! batch
//!     .add("Switch.GetStatus", json!({"id": 0}))
//!     .add("Switch.GetStatus", json!({"id": 1}));
//!
//! for result in batch.execute(&CallContext::new()).await? {
//!     let status: Option<serde_json::Value> = result.unmarshal()?;
//!     println!("{} -> {:?}", result.method(), status);
//! }
//! # Ok(())
//! # }
//! ```

use crate::builder::encode_params;
use crate::context::CallContext;
use crate::Client;
use drpc_core::{decode_payload, Error, ErrorCodeTable, Id, Request, Response, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// A call waiting to be sent in a batch
///
/// Parameters are encoded when the call is added. An encoding failure is kept
/// and reported when the batch is built, before anything is sent.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    method: String,
    params: Result<Option<Value>>,
}

impl BatchRequest {
    pub fn new<P: Serialize>(method: impl Into<String>, params: P) -> Self {
        Self {
            method: method.into(),
            params: encode_params(params),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Encoded parameters, or the error encoding them produced
    pub fn params(&self) -> Result<Option<Value>> {
        self.params.clone()
    }
}

/// Outcome of one call in a batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    method: String,
    id: Id,
    outcome: Result<Option<Value>>,
}

impl BatchResult {
    /// Method of the call this slot belongs to
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Identifier the call was sent with
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Result payload; `None` on error or for an empty result
    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok().and_then(Option::as_ref)
    }

    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    /// Decode the payload of this slot
    ///
    /// The slot's error is returned as is, without decoding. An empty payload
    /// is `Ok(None)`.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.outcome {
            Err(e) => Err(e.clone()),
            Ok(payload) => decode_payload(payload.as_ref()),
        }
    }

    pub fn into_result(self) -> Result<Option<Value>> {
        self.outcome
    }
}

/// Match parsed responses back to the requests that were sent
///
/// Results come out in request order. Identifiers are compared with numeric
/// normalization; if a device repeats an identifier the first response wins.
pub(crate) fn correlate(
    requests: &[Request],
    responses: Vec<Response>,
    table: Option<&dyn ErrorCodeTable>,
) -> Vec<BatchResult> {
    let mut by_id: HashMap<Id, Response> = HashMap::with_capacity(responses.len());
    for response in responses {
        by_id.entry(response.id.clone()).or_insert(response);
    }

    requests
        .iter()
        .map(|request| {
            let id = request.id.clone().unwrap_or_default();
            let outcome = match by_id.remove(&id) {
                None => Err(Error::MissingResponse { id: id.clone() }),
                Some(Response {
                    error: Some(error), ..
                }) => {
                    let err = Error::from(error);
                    Err(match table {
                        Some(table) => err.classify(table),
                        None => err,
                    })
                }
                Some(Response { result, .. }) => Ok(result.filter(|v| !v.is_null())),
            };

            BatchResult {
                method: request.method.clone(),
                id,
                outcome,
            }
        })
        .collect()
}

/// Calls accumulated for one batched round trip
///
/// Created by [`Client::batch`]. Calls are kept after `execute`, so the same
/// batch can be sent again; use [`Batch::clear`] to start over.
pub struct Batch {
    client: Client,
    entries: Vec<BatchRequest>,
}

impl Batch {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            entries: Vec::new(),
        }
    }

    /// Queue a call
    pub fn add<P: Serialize>(&mut self, method: impl Into<String>, params: P) -> &mut Self {
        self.entries.push(BatchRequest::new(method, params));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Queued methods, in add order
    pub fn methods(&self) -> Vec<&str> {
        self.entries.iter().map(BatchRequest::method).collect()
    }

    /// Send every queued call in one transport round trip
    ///
    /// Returns one result per queued call, in add order. An empty batch
    /// returns immediately without touching the transport.
    pub async fn execute(&self, ctx: &CallContext) -> Result<Vec<BatchResult>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        self.client.execute_batch(ctx, &self.entries).await
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch").field("entries", &self.entries).finish()
    }
}
