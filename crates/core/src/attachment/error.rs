//! Attachment error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Attachment operation errors.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A column holds JSON that is not an attachment.
    #[error("invalid value in attachment column '{column}': {reason}")]
    InvalidColumnValue {
        /// Column name.
        column: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// Reading a local source file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AttachmentError {
    /// Create an invalid column value error.
    #[must_use]
    pub fn invalid_column_value(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidColumnValue {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
