//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - A unit of work pairing a database transaction with its hook context
//! - Repositories that fire attachment lifecycle events around every statement
//! - Database migrations

pub mod entities;
pub mod error;
pub mod migration;
pub mod models;
pub mod repositories;
pub mod unit_of_work;

pub use error::RepositoryError;
pub use models::{User, UserView};
pub use repositories::UserRepository;
pub use unit_of_work::UnitOfWork;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use stowage_core::{AttachmentError, StorageConfig, StorageService};
use stowage_shared::{AppConfig, DatabaseConfig};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the `database` config section.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    Database::connect(options).await
}

/// Connects the database and the file store described by `config` and
/// returns a repository wired to both.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the storage provider
/// cannot be initialized.
pub async fn open(config: &AppConfig) -> Result<UserRepository, RepositoryError> {
    let db = connect_with(&config.database).await?;
    let store = StorageService::from_config(StorageConfig::from_settings(&config.storage))
        .map_err(AttachmentError::from)?;

    tracing::debug!(provider = store.provider_name(), "attachment store ready");
    Ok(UserRepository::with_store(db, Arc::new(store)))
}
