//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] simplechat_storage::StorageError),

    #[error("Identity error: {0}")]
    Identity(#[from] simplechat_identity::IdentityError),
}
