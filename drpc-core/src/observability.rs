//! Logging and OpenTelemetry bootstrap
//!
//! The client logs through `tracing`. Applications that want those events
//! (and the client's spans and metrics) exported call [`init_observability`]
//! once at startup. Local logs are written as JSON; spans and metrics go to
//! an OTLP collector over gRPC when enabled.
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: default collector endpoint
//! - `RUST_LOG`: log filter, takes precedence over the configured level
//!
//! ```rust,no_run
//! use drpc_core::ObservabilityConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ObservabilityConfig::new("garage-controller")
//!         .with_endpoint("http://localhost:4317")
//!         .with_log_level("debug");
//!
//!     drpc_core::init_observability(config).expect("Failed to init observability");
//!     // ... talk to devices ...
//!     drpc_core::shutdown_observability();
//! }
//! ```

use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Providers kept so they can be flushed on shutdown
struct Providers {
    tracer: Option<SdkTracerProvider>,
    meter: Option<SdkMeterProvider>,
}

static PROVIDERS: Mutex<Option<Providers>> = Mutex::new(None);

/// Observability configuration
///
/// Defaults: service name "drpc", crate version, endpoint from
/// `OTEL_EXPORTER_OTLP_ENDPOINT` (or `http://localhost:4317`), traces and
/// metrics export on, JSON logs, level from `RUST_LOG` (or "info").
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to all exported telemetry
    pub service_name: String,

    pub service_version: String,

    /// OTLP gRPC collector endpoint
    pub otlp_endpoint: String,

    /// Export spans to the collector
    pub enable_traces: bool,

    /// Export metrics to the collector
    pub enable_metrics: bool,

    /// Format local log lines as JSON instead of plain text
    pub json_logs: bool,

    /// Log filter directive, e.g. "info" or "drpc_client=debug"
    pub log_level: String,

    /// How often metrics are pushed
    pub metrics_interval: Duration,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "drpc".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_traces: true,
            enable_metrics: true,
            json_logs: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_interval: Duration::from_secs(30),
        }
    }
}

impl ObservabilityConfig {
    /// Defaults with a custom service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    pub fn with_json_logs(mut self, enable: bool) -> Self {
        self.json_logs = enable;
        self
    }

    pub fn with_metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }

    fn resource(&self) -> Resource {
        Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

/// Install the global tracing subscriber and OpenTelemetry providers
///
/// Call once per process. A second call fails because the global subscriber
/// is already set.
pub fn init_observability(config: ObservabilityConfig) -> Result<(), BoxError> {
    let tracer_provider = if config.enable_traces {
        Some(init_tracer_provider(&config)?)
    } else {
        None
    };

    let meter_provider = if config.enable_metrics {
        Some(init_meter_provider(&config)?)
    } else {
        None
    };

    init_tracing_subscriber(&config, tracer_provider.as_ref())?;

    if let Ok(mut providers) = PROVIDERS.lock() {
        *providers = Some(Providers {
            tracer: tracer_provider,
            meter: meter_provider,
        });
    }

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.enable_traces,
        metrics = config.enable_metrics,
        "Observability initialized"
    );

    Ok(())
}

fn init_tracer_provider(config: &ObservabilityConfig) -> Result<SdkTracerProvider, BoxError> {
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build();

    global::set_tracer_provider(provider.clone());
    Ok(provider)
}

fn init_meter_provider(config: &ObservabilityConfig) -> Result<SdkMeterProvider, BoxError> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
        .with_interval(config.metrics_interval)
        .build();

    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

fn init_tracing_subscriber(
    config: &ObservabilityConfig,
    tracer_provider: Option<&SdkTracerProvider>,
) -> Result<(), BoxError> {
    use opentelemetry::trace::TracerProvider as _;

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let telemetry_layer = tracer_provider.map(|provider| {
        let tracer = provider.tracer(config.service_name.clone());
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    let registry = tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter);

    if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .json(),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

/// Flush and shut down the providers installed by [`init_observability`]
///
/// Safe to call more than once, or without a prior init.
pub fn shutdown_observability() {
    let providers = match PROVIDERS.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => None,
    };

    let Some(providers) = providers else {
        return;
    };

    if let Some(tracer) = providers.tracer {
        if let Err(e) = tracer.shutdown() {
            tracing::warn!(error = %e, "Tracer provider shutdown failed");
        }
    }
    if let Some(meter) = providers.meter {
        if let Err(e) = meter.shutdown() {
            tracing::warn!(error = %e, "Meter provider shutdown failed");
        }
    }

    tracing::info!("Observability shutdown complete");
}
