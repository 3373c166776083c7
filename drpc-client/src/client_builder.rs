//! Client builder for authentication, error classification and observability
//!
//! The `ClientBuilder` provides a fluent API for configuring a [`Client`]
//! around a transport. It allows you to:
//! - Attach credentials sent with every call
//! - Install an error-code table that classifies device errors
//! - Configure observability (OpenTelemetry)
//! - Set service name for telemetry
//!
//! # Examples
//!
//! ```rust,no_run
//! use drpc_client::{ClientBuilder, DigestCredentials, Transport};
//! use drpc_core::StandardCodes;
//! use std::sync::Arc;
//!
//! # fn example(transport: Arc<dyn Transport>) -> drpc_core::Result<()> {
//! let credentials = Arc::new(DigestCredentials::new("admin", "secret"));
//! let client = ClientBuilder::new(transport)
//!     .with_auth(credentials.clone())
//!     .with_error_table(Arc::new(StandardCodes))
//!     .with_default_observability()
//!     .service_name("my-device-client")
//!     .build()?;
//!
//! // once the device sends its challenge
//! credentials.set_challenge("shellypro1-abc", "1700000000", "SHA-256");
//! # Ok(())
//! # }
//! ```

use crate::auth::{AuthProvider, BasicCredentials};
use crate::builder::RequestBuilder;
use crate::notification::NotificationRouter;
use crate::transport::{NotificationSink, Transport};
use crate::{Client, ClientMetrics};
use drpc_core::{Error, ErrorCodeTable, ObservabilityConfig, Result};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Builder for configuring and creating a [`Client`]
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    auth: Option<Arc<dyn AuthProvider>>,
    error_table: Option<Arc<dyn ErrorCodeTable>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
    enable_metrics: bool,
}

impl ClientBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            auth: None,
            error_table: None,
            observability_config: None,
            service_name: None,
            enable_metrics: false,
        }
    }

    /// Attach credentials to every request
    pub fn with_auth(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    pub fn with_basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_auth(Arc::new(BasicCredentials::new(username, password)))
    }

    /// Classify device error codes with `table`
    pub fn with_error_table(mut self, table: Arc<dyn ErrorCodeTable>) -> Self {
        self.error_table = Some(table);
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    ///
    /// Also turns on client metrics.
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self.enable_metrics = true;
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(self) -> Self {
        self.with_observability(ObservabilityConfig::default())
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Record client metrics on the global meter without installing providers
    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Build the client
    ///
    /// Initializes observability when configured, then subscribes to the
    /// transport's push channel if it has one.
    pub fn build(self) -> Result<Client> {
        let mut service_name = self.service_name;

        if let Some(mut config) = self.observability_config {
            if let Some(ref name) = service_name {
                config.service_name = name.clone();
            }
            service_name = Some(config.service_name.clone());

            drpc_core::init_observability(config).map_err(|e| {
                Error::Config(format!("Failed to initialize observability: {}", e))
            })?;
        }

        let metrics = self.enable_metrics.then(|| {
            let name = service_name.unwrap_or_else(|| "drpc".to_string());
            Arc::new(ClientMetrics::new(name))
        });

        let router = NotificationRouter::new();
        let push_enabled = match self.transport.notification_source() {
            Some(source) => {
                source.subscribe(notification_sink(router.clone(), metrics.clone()))?;
                tracing::debug!("Subscribed to transport notifications");
                true
            }
            None => false,
        };

        Ok(Client {
            transport: self.transport,
            requests: Arc::new(RequestBuilder::new()),
            router,
            auth: self.auth,
            error_table: self.error_table,
            metrics,
            push_enabled,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Sink feeding pushed payloads to `router`
///
/// Unparseable payloads are logged and counted, never returned to the
/// transport.
fn notification_sink(router: NotificationRouter, metrics: Option<Arc<ClientMetrics>>) -> NotificationSink {
    Arc::new(move |data: &[u8]| {
        let outcome = match router.route_raw(data) {
            Ok(()) => "routed",
            Err(e) => {
                tracing::warn!(error = %e, len = data.len(), "Dropping unparseable notification");
                "dropped"
            }
        };
        if let Some(ref m) = metrics {
            m.record_notification(outcome);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallContext;
    use crate::transport::{NotificationSource, Outgoing};
    use async_trait::async_trait;
    use drpc_core::StandardCodes;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Silent;

    #[async_trait]
    impl Transport for Silent {
        async fn call(&self, _ctx: &CallContext, _outgoing: Outgoing<'_>) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Pushing {
        sink: Mutex<Option<NotificationSink>>,
        refuse: bool,
    }

    impl NotificationSource for Pushing {
        fn subscribe(&self, sink: NotificationSink) -> Result<()> {
            if self.refuse {
                return Err(Error::Transport("push channel unavailable".to_string()));
            }
            *self.sink.lock() = Some(sink);
            Ok(())
        }

        fn unsubscribe(&self) -> Result<()> {
            self.sink.lock().take();
            Ok(())
        }
    }

    #[async_trait]
    impl Transport for Pushing {
        async fn call(&self, _ctx: &CallContext, _outgoing: Outgoing<'_>) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn notification_source(&self) -> Option<&dyn NotificationSource> {
            Some(self)
        }
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new(Arc::new(Silent));

        assert!(builder.auth.is_none());
        assert!(builder.error_table.is_none());
        assert!(builder.observability_config.is_none());
        assert!(builder.service_name.is_none());
        assert!(!builder.enable_metrics);
    }

    #[test]
    fn test_builder_observability_config() {
        let config = ObservabilityConfig::new("test-client")
            .with_endpoint("http://localhost:4317")
            .with_log_level("debug");

        let builder = ClientBuilder::new(Arc::new(Silent)).with_observability(config);

        let obs_config = builder.observability_config.unwrap();
        assert_eq!(obs_config.service_name, "test-client");
        assert_eq!(obs_config.log_level, "debug");
        assert!(builder.enable_metrics);
    }

    #[test]
    fn test_builder_default_observability() {
        let builder = ClientBuilder::new(Arc::new(Silent)).with_default_observability();

        let obs_config = builder.observability_config.unwrap();
        assert_eq!(obs_config.service_name, "drpc");
    }

    #[test]
    fn test_builder_chaining() {
        let builder = ClientBuilder::new(Arc::new(Silent))
            .with_basic_auth("admin", "secret")
            .with_error_table(Arc::new(StandardCodes))
            .service_name("test-service")
            .with_metrics(true);

        assert!(builder.auth.is_some());
        assert!(builder.error_table.is_some());
        assert_eq!(builder.service_name, Some("test-service".to_string()));
        assert!(builder.enable_metrics);
    }

    #[test]
    fn test_build_with_metrics() {
        let client = ClientBuilder::new(Arc::new(Silent))
            .with_metrics(true)
            .build()
            .unwrap();

        assert!(client.metrics.is_some());
        assert!(!client.supports_notifications());
    }

    #[test]
    fn test_build_subscribes_to_push_channel() {
        let transport = Arc::new(Pushing::default());
        let client = ClientBuilder::new(transport.clone()).build().unwrap();
        assert!(client.supports_notifications());

        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        client.on_method("NotifyStatus", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let sink = transport.sink.lock().clone().unwrap();
        sink(br#"{"jsonrpc":"2.0","method":"NotifyStatus","params":{}}"#);
        sink(b"garbage");

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_fails_when_subscription_refused() {
        let transport = Arc::new(Pushing {
            refuse: true,
            ..Default::default()
        });

        let err = ClientBuilder::new(transport).build().unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
