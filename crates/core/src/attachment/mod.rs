//! Attachment values and column types.
//!
//! This module provides:
//! - The [`Attachment`] value describing one stored file
//! - [`ColumnValue`], the single/list/empty content of an attachment column
//! - [`AttachmentColumn`], the per-column schema declaration
//! - Attachment error types

mod column;
mod error;
mod types;

pub use column::{AttachmentColumn, ColumnValue};
pub use error::AttachmentError;
pub use types::{Attachment, DEFAULT_MIME_TYPE};
