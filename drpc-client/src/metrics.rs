//! Client metrics definitions
//!
//! OpenTelemetry instruments describing how the client talks to devices.
//! They are exported through whatever meter provider is installed globally,
//! usually by `drpc_core::init_observability`.
//!
//! # Metrics Collected
//!
//! - **calls_total**: Calls sent, by method and status (counter)
//! - **call_duration**: Round-trip latency in seconds (histogram)
//! - **errors_total**: Failures by kind (counter)
//! - **batch_size**: Requests per batch (histogram)
//! - **notifications_total**: Pushed payloads by routing outcome (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use drpc_client::ClientMetrics;
//!
//! let metrics = ClientMetrics::new("my-device-client");
//! metrics.record_call("Switch.Set", "success", 0.012);
//! ```

use drpc_core::Error;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    InstrumentationScope, KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Total number of calls sent
    pub calls_total: Counter<u64>,
    /// Call duration in seconds
    pub call_duration: Histogram<f64>,
    /// Total number of errors
    pub errors_total: Counter<u64>,
    /// Batch size distribution
    pub batch_size: Histogram<u64>,
    /// Pushed payloads seen by the router
    pub notifications_total: Counter<u64>,
}

impl ClientMetrics {
    pub fn new(service_name: impl Into<String>) -> Self {
        let scope = InstrumentationScope::builder(service_name.into()).build();
        let meter = global::meter_with_scope(scope);
        Self::new_with_meter(&meter)
    }

    /// Build the instruments on a caller-supplied meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            calls_total: meter
                .u64_counter("drpc.client.calls.total")
                .with_description("Total number of calls sent")
                .build(),
            call_duration: meter
                .f64_histogram("drpc.client.call.duration")
                .with_description("Call round-trip duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("drpc.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
            batch_size: meter
                .u64_histogram("drpc.client.batch.size")
                .with_description("Number of requests in batch operations")
                .build(),
            notifications_total: meter
                .u64_counter("drpc.client.notifications.total")
                .with_description("Pushed payloads by routing outcome")
                .build(),
        }
    }

    pub fn record_call(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.calls_total.add(1, attributes);
        self.call_duration.record(duration_secs, attributes);
    }

    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }

    pub fn record_batch(&self, size: u64) {
        self.batch_size.record(size, &[]);
    }

    /// Record a pushed payload; `outcome` is `routed` or `dropped`
    pub fn record_notification(&self, outcome: &str) {
        let attributes = &[KeyValue::new("outcome", outcome.to_string())];
        self.notifications_total.add(1, attributes);
    }
}

/// Short label for the `error_type` attribute
pub(crate) fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Serialization(_) => "serialization",
        Error::Transport(_) => "transport",
        Error::Protocol(_) => "protocol",
        Error::Rpc(_) => "rpc",
        Error::MissingResponse { .. } => "missing_response",
        Error::InvalidAuth(_) => "invalid_auth",
        Error::Timeout => "timeout",
        Error::Cancelled => "cancelled",
        Error::Closed => "closed",
        Error::Config(_) => "config",
    }
}
