//! SimpleChat Core
//!
//! Configuration and the page coordinator tying bootstrap, token acquisition,
//! telemetry and the chat view together. The identity client is created by
//! the host and injected; nothing here is a global.

mod app;
mod config;
mod error;

pub use app::{App, Page, PageState};
pub use config::Config;
pub use error::CoreError;

// Re-export core components
pub use simplechat_chat::{
    ChatEndpoint, ChatError, ChatSession, HttpChatEndpoint, SubmitOutcome, UnconfiguredEndpoint,
};
pub use simplechat_identity::{
    Account, EntraClient, EntraConfig, IdentityClient, IdentityError, InitializationError,
    Redirect, RedirectKind, ScopeSet, Session, SessionStatus,
};
pub use simplechat_storage::{Database, StorageError};
pub use simplechat_telemetry::Telemetry;
pub use simplechat_transcript::{Message, Origin, Transcript, ERROR_REPLY};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging to stderr. `RUST_LOG` overrides `default_directive`.
pub fn init_logging(default_directive: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
