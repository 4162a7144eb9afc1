//! Ingestion envelopes

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityLevel {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl SeverityLevel {
    pub fn as_i32(&self) -> i32 {
        match self {
            SeverityLevel::Verbose => 0,
            SeverityLevel::Information => 1,
            SeverityLevel::Warning => 2,
            SeverityLevel::Error => 3,
            SeverityLevel::Critical => 4,
        }
    }
}

/// Something worth reporting
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryItem {
    Event {
        name: String,
        properties: BTreeMap<String, String>,
    },
    Trace {
        message: String,
        severity: SeverityLevel,
    },
    Exception {
        type_name: String,
        message: String,
    },
    PageView {
        name: String,
        uri: Option<String>,
    },
}

impl TelemetryItem {
    /// Suffix of the envelope name
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryItem::Event { .. } => "Event",
            TelemetryItem::Trace { .. } => "Message",
            TelemetryItem::Exception { .. } => "Exception",
            TelemetryItem::PageView { .. } => "Pageview",
        }
    }

    fn base_type(&self) -> &'static str {
        match self {
            TelemetryItem::Event { .. } => "EventData",
            TelemetryItem::Trace { .. } => "MessageData",
            TelemetryItem::Exception { .. } => "ExceptionData",
            TelemetryItem::PageView { .. } => "PageviewData",
        }
    }

    fn base_data(&self) -> serde_json::Value {
        match self {
            TelemetryItem::Event { name, properties } => json!({
                "ver": 2,
                "name": name,
                "properties": properties,
            }),
            TelemetryItem::Trace { message, severity } => json!({
                "ver": 2,
                "message": message,
                "severityLevel": severity.as_i32(),
            }),
            TelemetryItem::Exception { type_name, message } => json!({
                "ver": 2,
                "exceptions": [{
                    "typeName": type_name,
                    "message": message,
                    "hasFullStack": false,
                }],
            }),
            TelemetryItem::PageView { name, uri } => json!({
                "ver": 2,
                "name": name,
                "url": uri.clone().unwrap_or_default(),
                "id": uuid::Uuid::new_v4().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeData {
    #[serde(rename = "baseType")]
    pub base_type: String,
    #[serde(rename = "baseData")]
    pub base_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub name: String,
    pub time: String,
    #[serde(rename = "iKey")]
    pub instrumentation_key: String,
    pub tags: BTreeMap<String, String>,
    pub data: EnvelopeData,
}

impl Envelope {
    pub fn new(
        item: &TelemetryItem,
        instrumentation_key: &str,
        tags: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: format!(
                "Microsoft.ApplicationInsights.{}.{}",
                instrumentation_key.replace('-', ""),
                item.kind()
            ),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            instrumentation_key: instrumentation_key.to_string(),
            tags,
            data: EnvelopeData {
                base_type: item.base_type().to_string(),
                base_data: item.base_data(),
            },
        }
    }

    /// Envelope name suffix (`Event`, `Message`, ...)
    pub fn kind(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or_default()
    }
}
