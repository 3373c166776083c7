//! End-to-end test through the `drpc` facade
//!
//! A tiny in-process "device" answers calls and batches and pushes a status
//! notification after every state change.

use async_trait::async_trait;
use drpc::client::{NotificationSink, NotificationSource, Outgoing};
use drpc::core::{codec, ErrorObject, Response};
use drpc::{CallContext, Client, Error, Result, Transport};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Relay with one output, answering `Switch.Set` and `Switch.GetStatus`
#[derive(Default)]
struct Relay {
    on: AtomicBool,
    sink: Mutex<Option<NotificationSink>>,
}

impl Relay {
    fn answer(&self, method: &str, params: Option<&Value>) -> std::result::Result<Value, ErrorObject> {
        match method {
            "Switch.GetStatus" => Ok(json!({"id": 0, "output": self.on.load(Ordering::SeqCst)})),
            "Switch.Set" => {
                let on = params
                    .and_then(|p| p.get("on"))
                    .and_then(Value::as_bool)
                    .ok_or_else(|| ErrorObject::invalid_params("missing on"))?;
                let was_on = self.on.swap(on, Ordering::SeqCst);
                Ok(json!({"was_on": was_on}))
            }
            other => Err(ErrorObject::method_not_found(other)),
        }
    }

    fn notify_status(&self) {
        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            let payload = json!({
                "jsonrpc": "2.0",
                "method": "NotifyStatus",
                "params": {"switch:0": {"output": self.on.load(Ordering::SeqCst)}}
            });
            sink(payload.to_string().as_bytes());
        }
    }
}

#[async_trait]
impl Transport for Relay {
    async fn call(&self, _ctx: &CallContext, outgoing: Outgoing<'_>) -> Result<Vec<u8>> {
        let responses: Vec<Response> = outgoing
            .requests()
            .iter()
            .filter_map(|req| {
                let id = req.id.clone()?;
                Some(match self.answer(&req.method, req.params.as_ref()) {
                    Ok(result) => Response::success(result, id),
                    Err(error) => Response::error(error, id),
                })
            })
            .collect();

        if outgoing.requests().iter().any(|r| r.method == "Switch.Set") {
            self.notify_status();
        }

        match outgoing {
            Outgoing::Batch(_) => codec::encode_batch_responses(&responses),
            Outgoing::Single(_) => match responses.first() {
                Some(response) => codec::encode_response(response),
                None => Ok(Vec::new()),
            },
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn notification_source(&self) -> Option<&dyn NotificationSource> {
        Some(self)
    }
}

impl NotificationSource for Relay {
    fn subscribe(&self, sink: NotificationSink) -> Result<()> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn unsubscribe(&self) -> Result<()> {
        self.sink.lock().unwrap().take();
        Ok(())
    }
}

#[tokio::test]
async fn test_relay_round_trip() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("drpc_client=debug")
        .try_init();

    let client = Client::new(Arc::new(Relay::default())).unwrap();
    let ctx = CallContext::new();

    let pushes = Arc::new(AtomicUsize::new(0));
    let p = Arc::clone(&pushes);
    client.on_method("NotifyStatus", move |params| {
        assert!(params["switch:0"]["output"].is_boolean());
        p.fetch_add(1, Ordering::SeqCst);
    });

    let result: Value = client.call(&ctx, "Switch.Set", json!({"id": 0, "on": true})).await.unwrap();
    assert_eq!(result, json!({"was_on": false}));
    assert_eq!(pushes.load(Ordering::SeqCst), 1);

    let mut batch = client.batch();
    batch
        .add("Switch.GetStatus", json!({"id": 0}))
        .add("Switch.Explode", ())
        .add("Switch.Set", json!({"id": 0, "on": false}));

    let results = batch.execute(&ctx).await.unwrap();
    assert_eq!(results[0].result().unwrap()["output"], true);
    assert_eq!(results[1].error().and_then(Error::rpc_code), Some(-32601));
    assert_eq!(results[2].unmarshal::<Value>().unwrap(), Some(json!({"was_on": true})));
    assert_eq!(pushes.load(Ordering::SeqCst), 2);

    let err = client
        .call::<_, Value>(&ctx, "Switch.Set", json!({"id": 0}))
        .await
        .unwrap_err();
    assert_eq!(err.rpc_code(), Some(-32602));

    client.close().await.unwrap();
}
