//! Encoding and parsing of wire payloads
//!
//! Transports hand the client raw bytes. This module turns them into typed
//! messages and classifies payloads whose shape is not known in advance.
//!
//! # Version Tag
//!
//! Requests we emit always carry `"jsonrpc":"2.0"`. On the way in the tag is
//! optional because some firmware leaves it out, but a tag that is present and
//! wrong is rejected.
//!
//! # Classification
//!
//! [`parse_message`] inspects structure only:
//! - an array is a batch response
//! - an object with an `id` and a `result` or `error` is a response
//! - an object with a `method` and no `id` is a notification
//! - anything else is a protocol error
//!
//! # Examples
//!
//! ```rust
//! use drpc_core::codec;
//!
//! let msg = codec::parse_message(br#"{"id":1,"result":{}}"#).unwrap();
//! assert!(msg.is_response());
//!
//! let msg = codec::parse_message(br#"{"method":"NotifyStatus","params":{}}"#).unwrap();
//! assert!(msg.is_notification());
//! ```

use crate::error::{Error, Result};
use crate::types::{Message, Notification, Request, Response, JSONRPC_VERSION};
use serde::Serialize;
use serde_json::{Map, Value};

/// Encode any serializable message to bytes
pub fn encode<T: Serialize + ?Sized>(msg: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a single request
pub fn encode_request(req: &Request) -> Result<Vec<u8>> {
    encode(req)
}

/// Encode requests as one batch array, preserving order
pub fn encode_batch(requests: &[Request]) -> Result<Vec<u8>> {
    encode(requests)
}

/// Encode a response
pub fn encode_response(resp: &Response) -> Result<Vec<u8>> {
    encode(resp)
}

/// Encode responses as one batch array
pub fn encode_batch_responses(responses: &[Response]) -> Result<Vec<u8>> {
    encode(responses)
}

/// Encode a notification
pub fn encode_notification(notif: &Notification) -> Result<Vec<u8>> {
    encode(notif)
}

fn parse_value(data: &[u8], what: &str) -> Result<Value> {
    serde_json::from_slice(data).map_err(|e| Error::Protocol(format!("malformed {}: {}", what, e)))
}

/// Reject a version tag that is present and not "2.0"
fn check_version(object: &Map<String, Value>) -> Result<()> {
    match object.get("jsonrpc") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(v)) if v == JSONRPC_VERSION => Ok(()),
        Some(other) => Err(Error::Protocol(format!(
            "unsupported protocol version: {}",
            other
        ))),
    }
}

fn response_from_value(value: Value) -> Result<Response> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Protocol("response is not an object".to_string()))?;
    check_version(object)?;

    serde_json::from_value(value).map_err(|e| Error::Protocol(format!("invalid response: {}", e)))
}

fn notification_from_value(value: Value) -> Result<Notification> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Protocol("notification is not an object".to_string()))?;
    check_version(object)?;

    match object.get("method") {
        Some(Value::String(method)) if !method.is_empty() => {}
        _ => return Err(Error::Protocol("notification is missing method".to_string())),
    }

    serde_json::from_value(value)
        .map_err(|e| Error::Protocol(format!("invalid notification: {}", e)))
}

/// Parse a single response
///
/// # Errors
///
/// `Error::Protocol` for malformed JSON, a non-object payload, a malformed
/// error object, or a version tag other than "2.0".
pub fn parse_response(data: &[u8]) -> Result<Response> {
    response_from_value(parse_value(data, "response")?)
}

/// Parse a batch response array, keeping wire order
///
/// Correlating entries to requests is left to the caller.
pub fn parse_batch_response(data: &[u8]) -> Result<Vec<Response>> {
    match parse_value(data, "batch response")? {
        Value::Array(items) => items.into_iter().map(response_from_value).collect(),
        _ => Err(Error::Protocol("batch response is not an array".to_string())),
    }
}

/// Parse a notification
///
/// # Errors
///
/// `Error::Protocol` when the method name is missing or empty, or the version
/// tag is wrong.
pub fn parse_notification(data: &[u8]) -> Result<Notification> {
    notification_from_value(parse_value(data, "notification")?)
}

/// Classify a payload by its structure
pub fn parse_message(data: &[u8]) -> Result<Message> {
    let value: Value = serde_json::from_slice(data)
        .map_err(|e| Error::Protocol(format!("cannot classify message: {}", e)))?;

    match value {
        Value::Array(items) => {
            let responses = items
                .into_iter()
                .map(response_from_value)
                .collect::<Result<Vec<_>>>()?;
            Ok(Message::Batch(responses))
        }
        Value::Object(ref object) => {
            let has_id = object.contains_key("id");
            let has_outcome = object.contains_key("result") || object.contains_key("error");
            let id_absent = object.get("id").map_or(true, Value::is_null);

            if has_id && has_outcome {
                response_from_value(value).map(Message::Response)
            } else if object.contains_key("method") && id_absent {
                notification_from_value(value).map(Message::Notification)
            } else {
                Err(Error::Protocol(
                    "cannot classify message: neither response nor notification".to_string(),
                ))
            }
        }
        _ => Err(Error::Protocol(
            "cannot classify message: not an object or array".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorObject;
    use crate::types::Id;
    use serde_json::json;

    #[test]
    fn test_encode_parse_response() {
        let resp = Response::success(json!({"was_on": false}), Id::from(4u64));
        let encoded = encode_response(&resp).unwrap();
        let decoded = parse_response(&encoded).unwrap();

        assert!(decoded.is_success());
        assert_eq!(decoded.id, Id::from(4u64));
        assert_eq!(decoded.result, resp.result);
    }

    #[test]
    fn test_encode_parse_null_result() {
        let resp = Response::success(serde_json::Value::Null, Id::from(1u64));
        let encoded = encode_response(&resp).unwrap();
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&encoded).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "result": null})
        );

        let decoded = parse_response(&encoded).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn test_encode_parse_error_response() {
        let resp = Response::error(ErrorObject::new(-105, "not found"), Id::from("x"));
        let decoded = parse_response(&encode_response(&resp).unwrap()).unwrap();

        assert!(decoded.is_error());
        assert_eq!(decoded.error, resp.error);
        assert_eq!(decoded.id, Id::from("x"));
    }

    #[test]
    fn test_parse_response_without_version() {
        let resp = parse_response(br#"{"id":1,"result":{"ok":true}}"#).unwrap();
        assert!(resp.jsonrpc.is_none());
        assert_eq!(resp.id, Id::from(1u64));
    }

    #[test]
    fn test_parse_response_wrong_version() {
        let err = parse_response(br#"{"jsonrpc":"1.0","id":1,"result":{}}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        let err = parse_response(br#"{"jsonrpc":2,"id":1,"result":{}}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_parse_response_malformed() {
        assert!(matches!(parse_response(b"not json"), Err(Error::Protocol(_))));
        assert!(matches!(parse_response(b""), Err(Error::Protocol(_))));
        assert!(matches!(parse_response(b"[1,2]"), Err(Error::Protocol(_))));
        assert!(matches!(
            parse_response(br#"{"id":1,"error":{"message":"no code"}}"#),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_batch_response_keeps_wire_order() {
        let data = br#"[{"id":2,"result":"b"},{"id":3,"result":"c"},{"id":1,"result":"a"}]"#;
        let responses = parse_batch_response(data).unwrap();

        let ids: Vec<_> = responses.iter().map(|r| r.id.as_u64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_parse_batch_response_rejects_object() {
        assert!(parse_batch_response(br#"{"id":1,"result":{}}"#).is_err());
    }

    #[test]
    fn test_parse_batch_response_empty_array() {
        assert!(parse_batch_response(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_notification() {
        let notif =
            parse_notification(br#"{"method":"NotifyStatus","params":{"switch:0":{"output":true}}}"#)
                .unwrap();
        assert_eq!(notif.method, "NotifyStatus");
        assert!(notif.params.is_some());
    }

    #[test]
    fn test_parse_notification_missing_method() {
        assert!(parse_notification(br#"{"params":{}}"#).is_err());
        assert!(parse_notification(br#"{"method":""}"#).is_err());
        assert!(parse_notification(br#"{"method":5}"#).is_err());
    }

    #[test]
    fn test_parse_message_classification() {
        assert!(parse_message(br#"{"id":1,"result":{}}"#).unwrap().is_response());
        assert!(parse_message(br#"{"id":1,"error":{"code":1,"message":"x"}}"#)
            .unwrap()
            .is_response());
        assert!(parse_message(br#"[{"id":1,"result":{}}]"#).unwrap().is_batch());
        assert!(parse_message(br#"{"method":"X"}"#).unwrap().is_notification());
        assert!(parse_message(br#"{"method":"X","id":null}"#)
            .unwrap()
            .is_notification());
    }

    #[test]
    fn test_parse_message_unclassifiable() {
        assert!(matches!(parse_message(b"{not json"), Err(Error::Protocol(_))));
        assert!(matches!(parse_message(b"{}"), Err(Error::Protocol(_))));
        assert!(matches!(parse_message(b"42"), Err(Error::Protocol(_))));
        // an id with neither outcome nor method is an echo of a request, not a response
        assert!(matches!(parse_message(br#"{"id":1}"#), Err(Error::Protocol(_))));
        assert!(matches!(parse_message(br#"{"id":1,"method":"X"}"#), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_encode_batch_preserves_order() {
        let requests = vec![
            Request::new("a", None, Id::from(1u64)),
            Request::new("b", None, Id::from(2u64)),
        ];
        let encoded = encode_batch(&requests).unwrap();
        let decoded: Vec<Request> = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(decoded, requests);
    }

    #[test]
    fn test_encode_batch_responses() {
        let responses = vec![
            Response::success(json!(1), Id::from(1u64)),
            Response::success(json!(2), Id::from(2u64)),
        ];
        let encoded = encode_batch_responses(&responses).unwrap();
        assert_eq!(parse_batch_response(&encoded).unwrap(), responses);
    }

    #[test]
    fn test_encode_notification() {
        let notif = Notification::new("NotifyEvent", Some(json!({"events": []})));
        let decoded = parse_notification(&encode_notification(&notif).unwrap()).unwrap();
        assert_eq!(decoded, notif);
    }
}
