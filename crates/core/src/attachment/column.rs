//! Attachment column configuration and values.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use super::error::AttachmentError;
use super::types::Attachment;

/// Per-column configuration, declared with the entity schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentColumn {
    /// Column name.
    pub name: &'static str,
    /// Whether the column holds a list of attachments.
    pub multiple: bool,
    /// Resolve URLs for every value read from the database.
    pub pre_compute_url: bool,
    /// Folder prefix for newly written files.
    pub folder: Option<&'static str>,
}

impl AttachmentColumn {
    /// A column holding at most one attachment.
    #[must_use]
    pub const fn single(name: &'static str) -> Self {
        Self {
            name,
            multiple: false,
            pre_compute_url: false,
            folder: None,
        }
    }

    /// A column holding a list of attachments.
    #[must_use]
    pub const fn multiple(name: &'static str) -> Self {
        Self {
            name,
            multiple: true,
            pre_compute_url: false,
            folder: None,
        }
    }

    /// Enable URL precomputation on read.
    #[must_use]
    pub const fn pre_compute_url(mut self) -> Self {
        self.pre_compute_url = true;
        self
    }

    /// Store new files under `folder`.
    #[must_use]
    pub const fn in_folder(mut self, folder: &'static str) -> Self {
        self.folder = Some(folder);
        self
    }
}

/// Value of an attachment column.
///
/// Serializes as `null`, an object, or an array of objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// No attachment stored.
    #[default]
    Empty,
    /// A single attachment.
    Single(Attachment),
    /// A list of attachments.
    Multiple(Vec<Attachment>),
}

impl ColumnValue {
    /// All attachments, a single value being a one-element list.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        match self {
            Self::Empty => &[],
            Self::Single(attachment) => std::slice::from_ref(attachment),
            Self::Multiple(list) => list,
        }
    }

    /// Mutable view of all attachments.
    pub fn attachments_mut(&mut self) -> &mut [Attachment] {
        match self {
            Self::Empty => &mut [],
            Self::Single(attachment) => std::slice::from_mut(attachment),
            Self::Multiple(list) => list,
        }
    }

    /// Returns `true` when no attachment is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attachments().is_empty()
    }

    /// The single attachment, or the first of a list.
    #[must_use]
    pub fn first(&self) -> Option<&Attachment> {
        self.attachments().first()
    }

    /// Stored names of all attachments.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.attachments()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Names held here but not in `other`.
    #[must_use]
    pub fn names_not_in(&self, other: &ColumnValue) -> Vec<String> {
        let keep: HashSet<&str> = other.attachments().iter().map(Attachment::name).collect();
        self.attachments()
            .iter()
            .map(Attachment::name)
            .filter(|name| !keep.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Whether both values reference the same stored files.
    #[must_use]
    pub fn same_files(&self, other: &ColumnValue) -> bool {
        self.names() == other.names()
    }

    /// JSON stored in the database. Empty values map to SQL `NULL`.
    ///
    /// URLs are never stored.
    #[must_use]
    pub fn to_db_json(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }

        let mut stored = self.clone();
        for attachment in stored.attachments_mut() {
            attachment.clear_url();
        }
        serde_json::to_value(&stored).ok()
    }

    /// Rehydrate a column read from the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe attachments matching
    /// the column's cardinality.
    pub fn from_db_json(
        column: &AttachmentColumn,
        value: Option<Value>,
    ) -> Result<Self, AttachmentError> {
        let invalid = |e: serde_json::Error| AttachmentError::invalid_column_value(column.name, e.to_string());

        match value {
            None | Some(Value::Null) => Ok(Self::Empty),
            Some(Value::Array(items)) if column.multiple => {
                let list: Vec<Attachment> =
                    serde_json::from_value(Value::Array(items)).map_err(invalid)?;
                Ok(Self::from(list))
            }
            Some(object @ Value::Object(_)) => {
                let attachment: Attachment = serde_json::from_value(object).map_err(invalid)?;
                if column.multiple {
                    Ok(Self::Multiple(vec![attachment]))
                } else {
                    Ok(Self::Single(attachment))
                }
            }
            Some(other) => Err(AttachmentError::invalid_column_value(
                column.name,
                format!("unexpected JSON value: {other}"),
            )),
        }
    }
}

impl From<Attachment> for ColumnValue {
    fn from(attachment: Attachment) -> Self {
        Self::Single(attachment)
    }
}

impl From<Option<Attachment>> for ColumnValue {
    fn from(attachment: Option<Attachment>) -> Self {
        attachment.map_or(Self::Empty, Self::Single)
    }
}

impl From<Vec<Attachment>> for ColumnValue {
    fn from(list: Vec<Attachment>) -> Self {
        if list.is_empty() {
            Self::Empty
        } else {
            Self::Multiple(list)
        }
    }
}
