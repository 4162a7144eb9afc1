//! Telemetry hook
//!
//! A cheap, cloneable handle. Until `initialize` receives a usable connection
//! string every tracking call returns immediately.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::connection::ConnectionString;
use crate::correlation::{CorrelationPolicy, TraceContext};
use crate::envelope::{Envelope, SeverityLevel, TelemetryItem};
use crate::sink::{HttpSink, TelemetrySink};

const ROLE_NAME: &str = "simplechat";
const PAGE_NAME: &str = "SimpleChat";

struct Active {
    connection: ConnectionString,
    sink: Arc<dyn TelemetrySink>,
    policy: CorrelationPolicy,
    session_id: String,
    authenticated_user: Option<String>,
}

pub struct Telemetry {
    active: Arc<RwLock<Option<Active>>>,
}

impl Telemetry {
    /// Unconfigured hook; every call is a no-op
    pub fn new() -> Self {
        Self {
            active: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.active.read().is_some()
    }

    /// Configure from a connection string. Only the first usable string has an
    /// effect; later calls leave the existing configuration alone. Returns
    /// whether telemetry is active afterwards.
    pub fn initialize(&self, connection_string: Option<&str>) -> bool {
        let Some(raw) = connection_string.map(str::trim).filter(|s| !s.is_empty()) else {
            tracing::debug!("Telemetry connection string not provided, skipping initialization");
            return self.is_initialized();
        };
        if self.is_initialized() {
            return true;
        }

        let connection = match ConnectionString::parse(raw) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(error = %e, "Telemetry disabled");
                return false;
            }
        };
        let sink = match connection.track_url() {
            Ok(url) => Arc::new(HttpSink::new(url)),
            Err(e) => {
                tracing::warn!(error = %e, "Telemetry disabled");
                return false;
            }
        };

        self.install(connection, sink)
    }

    /// Like `initialize`, delivering to `sink` instead of the ingestion endpoint
    pub fn initialize_with_sink(&self, connection_string: &str, sink: Arc<dyn TelemetrySink>) -> bool {
        if self.is_initialized() {
            return true;
        }
        match ConnectionString::parse(connection_string) {
            Ok(connection) => self.install(connection, sink),
            Err(e) => {
                tracing::warn!(error = %e, "Telemetry disabled");
                false
            }
        }
    }

    fn install(&self, connection: ConnectionString, sink: Arc<dyn TelemetrySink>) -> bool {
        {
            let mut active = self.active.write();
            if active.is_some() {
                return true;
            }

            tracing::info!(
                endpoint = %connection.ingestion_endpoint,
                "Telemetry initialized"
            );

            *active = Some(Active {
                connection,
                sink,
                policy: CorrelationPolicy::new(),
                session_id: Uuid::new_v4().to_string(),
                authenticated_user: None,
            });
        }

        self.track_page_view(PAGE_NAME, None);
        true
    }

    pub fn track_event(&self, name: &str, properties: &[(&str, &str)]) {
        self.dispatch(TelemetryItem::Event {
            name: name.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    pub fn track_trace(&self, message: &str, severity: SeverityLevel) {
        self.dispatch(TelemetryItem::Trace {
            message: message.to_string(),
            severity,
        });
    }

    pub fn track_exception(&self, type_name: &str, message: &str) {
        self.dispatch(TelemetryItem::Exception {
            type_name: type_name.to_string(),
            message: message.to_string(),
        });
    }

    pub fn track_page_view(&self, name: &str, uri: Option<&str>) {
        self.dispatch(TelemetryItem::PageView {
            name: name.to_string(),
            uri: uri.map(str::to_string),
        });
    }

    pub fn set_authenticated_user_context(&self, user_id: &str) {
        if let Some(active) = self.active.write().as_mut() {
            active.authenticated_user = Some(user_id.to_string());
        }
    }

    pub fn clear_authenticated_user_context(&self) {
        if let Some(active) = self.active.write().as_mut() {
            active.authenticated_user = None;
        }
    }

    /// `traceparent` value for a request to `url`, when telemetry is active
    /// and the host is not excluded
    pub fn traceparent_for(&self, url: &Url) -> Option<String> {
        let active = self.active.read();
        let active = active.as_ref()?;
        if !active.policy.should_correlate(url) {
            return None;
        }
        Some(TraceContext::generate().traceparent())
    }

    fn dispatch(&self, item: TelemetryItem) {
        let active = self.active.read();
        let Some(active) = active.as_ref() else {
            return;
        };

        let mut tags = BTreeMap::new();
        tags.insert("ai.cloud.role".to_string(), ROLE_NAME.to_string());
        tags.insert("ai.session.id".to_string(), active.session_id.clone());
        if let Some(user) = &active.authenticated_user {
            tags.insert("ai.user.authUserId".to_string(), user.clone());
        }

        let envelope = Envelope::new(&item, &active.connection.instrumentation_key, tags);
        active.sink.submit(envelope);
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Telemetry {
    fn clone(&self) -> Self {
        Self {
            active: Arc::clone(&self.active),
        }
    }
}
