//! SimpleChat Telemetry
//!
//! Optional, fire-and-forget telemetry in the Application Insights format:
//! - Configured by a connection string; without one every call is a no-op
//! - Events, traces, exceptions and page views posted on a background task
//! - W3C `traceparent` correlation for outgoing requests, except to
//!   excluded identity provider domains

mod connection;
mod correlation;
mod envelope;
mod error;
mod sink;
mod telemetry;

pub use connection::ConnectionString;
pub use correlation::{CorrelationPolicy, TraceContext, TRACEPARENT_HEADER};
pub use envelope::{Envelope, SeverityLevel, TelemetryItem};
pub use error::TelemetryError;
#[cfg(any(test, feature = "testing"))]
pub use sink::MemorySink;
pub use sink::{HttpSink, TelemetrySink};
pub use telemetry::Telemetry;

pub type Result<T> = std::result::Result<T, TelemetryError>;
