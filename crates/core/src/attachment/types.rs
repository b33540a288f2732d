//! Attachment value type.

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AttachmentError;
use crate::storage::{FileStore, StorageError};

/// Fallback mime type when nothing can be inferred.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Description of one stored file.
///
/// Values built from client bytes start unpersisted and carry their bytes
/// until the first successful write. Values deserialized from a column are
/// always persisted and never carry bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_name: Option<String>,
    size: u64,
    mime_type: String,
    extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip, default = "persisted")]
    is_persisted: bool,
    #[serde(skip)]
    source: Option<Bytes>,
}

fn persisted() -> bool {
    true
}

impl Attachment {
    /// Create an unpersisted attachment from raw bytes.
    ///
    /// The extension and mime type are inferred from `original_name`; the
    /// stored name is a fresh random token that keeps the extension.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>, original_name: impl Into<String>) -> Self {
        let bytes = bytes.into();
        let original_name = original_name.into();

        let extension = Path::new(&original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(&original_name)
            .first()
            .map_or_else(|| DEFAULT_MIME_TYPE.to_string(), |m| m.essence_str().to_string());

        Self {
            name: generate_name(&extension),
            original_name: Some(original_name).filter(|n| !n.is_empty()),
            size: bytes.len() as u64,
            mime_type,
            extension,
            url: None,
            is_persisted: false,
            source: Some(bytes),
        }
    }

    /// Read a local file into an unpersisted attachment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let original_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::from_bytes(bytes, original_name))
    }

    /// Override the inferred mime type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Stored (generated) name, which is also the path in the file store.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name supplied by the client, if any.
    #[must_use]
    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Mime type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// File extension without the leading dot. Empty when unknown.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// URL resolved for this process, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Whether the bytes are known to be in the file store.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.is_persisted
    }

    /// Whether bytes are still waiting to be written.
    #[must_use]
    pub fn has_pending_source(&self) -> bool {
        !self.is_persisted && self.source.is_some()
    }

    /// Resolve the URL on demand and cache it on this value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot produce a URL.
    pub async fn compute_url<S: FileStore>(&mut self, store: &S) -> Result<&str, StorageError> {
        if self.url.is_none() {
            self.url = Some(store.url(&self.name).await?);
        }
        Ok(self.url.as_deref().unwrap_or_default())
    }

    pub(crate) fn set_url(&mut self, url: String) {
        self.url = Some(url);
    }

    pub(crate) fn clear_url(&mut self) {
        self.url = None;
    }

    /// Place an unpersisted attachment under `folder`.
    pub(crate) fn place_in(&mut self, folder: &str) {
        let prefix = format!("{}/", folder.trim_matches('/'));
        if !self.is_persisted && !self.name.starts_with(&prefix) {
            self.name = format!("{prefix}{}", self.name);
        }
    }

    pub(crate) fn source(&self) -> Option<&Bytes> {
        self.source.as_ref()
    }

    /// Record a successful write, handing back the bytes.
    pub(crate) fn mark_persisted(&mut self) -> Option<Bytes> {
        self.is_persisted = true;
        self.source.take()
    }

    /// Undo [`Self::mark_persisted`] after a compensating delete.
    pub(crate) fn restore_source(&mut self, bytes: Bytes) {
        self.is_persisted = false;
        self.source = Some(bytes);
    }
}

impl PartialEq for Attachment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.original_name == other.original_name
            && self.size == other.size
            && self.mime_type == other.mime_type
            && self.extension == other.extension
            && self.url == other.url
    }
}

impl Eq for Attachment {}

/// Random token plus the preserved extension.
fn generate_name(extension: &str) -> String {
    let token = Uuid::new_v4().simple();
    if extension.is_empty() {
        token.to_string()
    } else {
        format!("{token}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_infers_metadata() {
        let attachment = Attachment::from_bytes(&b"\xff\xd8\xff"[..], "Cat.JPEG");

        assert_eq!(attachment.extension(), "jpeg");
        assert_eq!(attachment.mime_type(), "image/jpeg");
        assert_eq!(attachment.size(), 3);
        assert_eq!(attachment.original_name(), Some("Cat.JPEG"));
        assert!(attachment.name().ends_with(".jpeg"));
        assert!(!attachment.is_persisted());
        assert!(attachment.has_pending_source());
        assert!(attachment.url().is_none());
    }

    #[test]
    fn test_from_bytes_without_extension() {
        let attachment = Attachment::from_bytes(Bytes::from_static(b"data"), "README");

        assert_eq!(attachment.extension(), "");
        assert_eq!(attachment.mime_type(), DEFAULT_MIME_TYPE);
        assert!(!attachment.name().contains('.'));
    }

    #[test]
    fn test_generated_names_are_unique() {
        let a = Attachment::from_bytes(Bytes::from_static(b"a"), "a.txt");
        let b = Attachment::from_bytes(Bytes::from_static(b"a"), "a.txt");
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn test_with_mime_type_overrides_guess() {
        let attachment =
            Attachment::from_bytes(Bytes::from_static(b"{}"), "data.bin").with_mime_type("application/json");
        assert_eq!(attachment.mime_type(), "application/json");
    }

    #[test]
    fn test_deserialized_attachment_is_persisted() {
        let json = serde_json::json!({
            "name": "abc.png",
            "size": 10,
            "mimeType": "image/png",
            "extension": "png"
        });

        let attachment: Attachment = serde_json::from_value(json).expect("valid attachment");
        assert!(attachment.is_persisted());
        assert!(!attachment.has_pending_source());
        assert!(attachment.original_name().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let mut attachment = Attachment::from_bytes(Bytes::from_static(b"png"), "photo.png");
        attachment.mark_persisted();

        let json = serde_json::to_value(&attachment).expect("serializes");
        assert_eq!(json["name"], attachment.name());
        assert_eq!(json["size"], 3);
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["extension"], "png");
        assert_eq!(json["originalName"], "photo.png");
        assert!(json.get("url").is_none());
        assert!(json.get("isPersisted").is_none());
    }

    #[test]
    fn test_place_in_folder_only_once() {
        let mut attachment = Attachment::from_bytes(Bytes::from_static(b"x"), "x.txt");
        attachment.place_in("/avatars/");
        attachment.place_in("avatars");

        assert!(attachment.name().starts_with("avatars/"));
        assert_eq!(attachment.name().matches("avatars/").count(), 1);
    }

    #[test]
    fn test_place_in_ignores_persisted() {
        let mut attachment = Attachment::from_bytes(Bytes::from_static(b"x"), "x.txt");
        attachment.mark_persisted();
        let name = attachment.name().to_string();

        attachment.place_in("avatars");
        assert_eq!(attachment.name(), name);
    }

    #[test]
    fn test_mark_persisted_then_restore() {
        let mut attachment = Attachment::from_bytes(Bytes::from_static(b"x"), "x.txt");

        let bytes = attachment.mark_persisted().expect("had bytes");
        assert!(attachment.is_persisted());
        assert!(attachment.source().is_none());

        attachment.restore_source(bytes);
        assert!(attachment.has_pending_source());
    }

    #[tokio::test]
    async fn test_compute_url_caches_result() {
        let config = crate::storage::StorageConfig::new(crate::storage::StorageProvider::Memory)
            .with_public_url("https://cdn.example/");
        let store = crate::storage::StorageService::from_config(config).expect("memory store");
        let mut attachment = Attachment::from_bytes(Bytes::from_static(b"x"), "x.txt");
        let expected = format!("https://cdn.example/{}", attachment.name());

        let url = attachment.compute_url(&store).await.expect("url").to_string();
        assert_eq!(url, expected);
        assert_eq!(attachment.url(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn test_compute_url_without_strategy_fails() {
        let store = crate::storage::StorageService::memory().expect("memory store");
        let mut attachment = Attachment::from_bytes(Bytes::from_static(b"x"), "x.txt");

        let result = attachment.compute_url(&store).await;
        assert!(matches!(result, Err(StorageError::PresignNotSupported)));
        assert!(attachment.url().is_none());
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let path = std::env::temp_dir().join(format!("stowage-{}.csv", Uuid::new_v4().simple()));
        tokio::fs::write(&path, b"a,b\n1,2\n").await.expect("temp file");

        let attachment = Attachment::from_path(&path).await.expect("readable");
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(attachment.extension(), "csv");
        assert_eq!(attachment.mime_type(), "text/csv");
        assert_eq!(attachment.size(), 8);
        assert!(attachment.has_pending_source());
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let result = Attachment::from_path("/definitely/not/here.png").await;
        assert!(matches!(result, Err(AttachmentError::Io(_))));
    }
}
