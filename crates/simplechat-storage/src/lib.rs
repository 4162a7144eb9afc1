//! SimpleChat Storage Layer
//!
//! SQLite-backed credential cache owned by the identity client.
//! Holds signed-in accounts, their refresh tokens and which account is active.
//! Access tokens and transcripts never touch this layer.

mod accounts;
mod database;
mod error;
mod migrations;

pub use accounts::{CachedAccount, RefreshTokenRecord};
pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
