//! Storage configuration types.

use stowage_shared::{StorageProvider, StorageSettings};

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Presigned read URL TTL in seconds (default: 3600 = 1 hour).
    pub url_ttl_secs: u64,
    /// Base URL for public links when the provider cannot presign.
    pub public_url: Option<String>,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Default URL TTL: 1 hour.
    pub const DEFAULT_URL_TTL: u64 = 3600;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            url_ttl_secs: Self::DEFAULT_URL_TTL,
            public_url: None,
        }
    }

    /// Build the store configuration from the application settings.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            max_file_size: settings.max_file_size,
            url_ttl_secs: settings.url_ttl_secs,
            public_url: settings.public_url.clone(),
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set presigned read URL TTL.
    #[must_use]
    pub fn with_url_ttl(mut self, secs: u64) -> Self {
        self.url_ttl_secs = secs;
        self
    }

    /// Set the public base URL.
    #[must_use]
    pub fn with_public_url(mut self, base: impl Into<String>) -> Self {
        self.public_url = Some(base.into());
        self
    }
}
