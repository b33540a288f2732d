//! Repository error types.

use sea_orm::DbErr;
use stowage_core::AttachmentError;
use thiserror::Error;

/// Errors returned by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The database statement failed. Carried unchanged.
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// An attachment could not be written or decoded.
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// The row does not exist.
    #[error("record not found")]
    NotFound,
}
