//! SimpleChat Identity
//!
//! - `IdentityClient` is the capability the rest of the client talks to:
//!   interactive login, silent token refresh, active-account bookkeeping.
//! - `EntraClient` implements it against the Microsoft identity platform
//!   (authorization code flow with PKCE).
//! - `SessionBootstrap` turns a freshly loaded page into a `Session`.
//! - `TokenProvider` obtains bearer tokens, escalating to a redirect when the
//!   cache cannot satisfy a scope without the user.
//!
//! Interactive operations never "return" to their caller in the usual sense:
//! they yield a `Redirect`, and the flow that asked for it is over.

mod account;
mod bootstrap;
mod client;
mod entra;
mod error;
mod provider;
mod redirect;
mod scope;
mod session;
mod token;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use account::Account;
pub use bootstrap::SessionBootstrap;
pub use client::IdentityClient;
pub use entra::{EntraClient, EntraConfig};
pub use error::{FailureKind, IdentityError, InitializationError};
pub use provider::{TokenOutcome, TokenProvider};
pub use redirect::{Redirect, RedirectKind};
pub use scope::ScopeSet;
pub use session::{Session, SessionStatus};
pub use token::TokenHandle;

pub type Result<T> = std::result::Result<T, IdentityError>;
