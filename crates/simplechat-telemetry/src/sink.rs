//! Telemetry delivery

#[cfg(any(test, feature = "testing"))]
use std::sync::Arc;
use url::Url;

use crate::envelope::Envelope;
use crate::error::TelemetryError;
use crate::Result;

/// Receives envelopes. Must not block or fail the caller.
pub trait TelemetrySink: Send + Sync {
    fn submit(&self, envelope: Envelope);
}

/// Posts envelopes to the ingestion endpoint from a spawned task
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSink {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

async fn post(client: &reqwest::Client, endpoint: Url, batch: &[Envelope]) -> Result<()> {
    let response = client.post(endpoint).json(batch).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(TelemetryError::Rejected(status.as_u16()));
    }
    Ok(())
}

impl TelemetrySink for HttpSink {
    fn submit(&self, envelope: Envelope) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(kind = %envelope.kind(), "No runtime, telemetry item dropped");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        handle.spawn(async move {
            if let Err(e) = post(&client, endpoint, std::slice::from_ref(&envelope)).await {
                tracing::debug!(kind = %envelope.kind(), error = %e, "Telemetry item dropped");
            }
        });
    }
}

/// Keeps envelopes in memory
#[cfg(any(test, feature = "testing"))]
#[derive(Clone, Default)]
pub struct MemorySink {
    envelopes: Arc<parking_lot::Mutex<Vec<Envelope>>>,
}

#[cfg(any(test, feature = "testing"))]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().clone()
    }

    /// Envelope kinds in submission order
    pub fn kinds(&self) -> Vec<String> {
        self.envelopes
            .lock()
            .iter()
            .map(|e| e.kind().to_string())
            .collect()
    }
}

#[cfg(any(test, feature = "testing"))]
impl TelemetrySink for MemorySink {
    fn submit(&self, envelope: Envelope) {
        self.envelopes.lock().push(envelope);
    }
}
