//! Connection string parsing
//!
//! `InstrumentationKey=<key>;IngestionEndpoint=<url>;...` with
//! case-insensitive keys. Unknown keys are ignored.

use url::Url;

use crate::error::TelemetryError;
use crate::Result;

/// Used when the connection string names no ingestion endpoint
const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub instrumentation_key: String,
    pub ingestion_endpoint: Url,
}

impl ConnectionString {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if input.is_empty() {
            return Err(TelemetryError::InvalidConnectionString(
                "empty connection string".to_string(),
            ));
        }

        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;

        for pair in input.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(TelemetryError::InvalidConnectionString(format!(
                    "malformed segment: {pair}"
                )));
            };

            match key.trim().to_lowercase().as_str() {
                "instrumentationkey" => instrumentation_key = Some(value.trim().to_string()),
                "ingestionendpoint" => ingestion_endpoint = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TelemetryError::InvalidConnectionString("missing InstrumentationKey".to_string())
            })?;

        let endpoint = ingestion_endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string());
        let ingestion_endpoint = Url::parse(&endpoint)?;

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint,
        })
    }

    /// `<IngestionEndpoint>/v2/track`
    pub fn track_url(&self) -> Result<Url> {
        let base = self.ingestion_endpoint.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/v2/track"))?)
    }
}
