//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use bytes::Bytes;
use opendal::{Builder, ErrorKind, Operator, services};

use super::config::StorageConfig;
use stowage_shared::StorageProvider;
use super::error::StorageError;
use super::store::FileStore;

/// OpenDAL-backed file store for attachments.
#[derive(Debug, Clone)]
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// In-memory store, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory backend cannot be initialized.
    pub fn memory() -> Result<Self, StorageError> {
        Self::from_config(StorageConfig::new(StorageProvider::Memory))
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                build_operator(builder)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);
                build_operator(builder)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );
                build_operator(builder)
            }
            StorageProvider::Memory => build_operator(services::Memory::default()),
        }
    }

    /// Build a public link from the configured base URL.
    fn public_url(&self, key: &str) -> Result<String, StorageError> {
        let base = self
            .config
            .public_url
            .as_deref()
            .ok_or(StorageError::PresignNotSupported)?;
        Ok(format!("{}/{}", base.trim_end_matches('/'), key))
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl FileStore for StorageService {
    async fn write(&self, path: &str, bytes: Bytes) -> Result<(), StorageError> {
        validate_key(path)?;

        let size = bytes.len() as u64;
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }

        self.operator
            .write(path, bytes)
            .await
            .map_err(StorageError::from)?;

        tracing::debug!(key = %path, size, provider = self.provider_name(), "wrote attachment");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match self.operator.delete(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        self.operator.stat(path).await.is_ok()
    }

    async fn url(&self, path: &str) -> Result<String, StorageError> {
        let ttl = Duration::from_secs(self.config.url_ttl_secs);

        match self.operator.presign_read(path, ttl).await {
            Ok(presigned) => Ok(presigned.uri().to_string()),
            Err(e) if e.kind() == ErrorKind::Unsupported => self.public_url(path),
            Err(e) => Err(StorageError::from(e)),
        }
    }
}

fn build_operator<B: Builder>(builder: B) -> Result<Operator, StorageError> {
    Ok(Operator::new(builder)
        .map_err(|e| StorageError::configuration(e.to_string()))?
        .finish())
}

/// Reject keys that would escape the store root or address a directory.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.split('/').any(|part| part == "..")
    {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}
