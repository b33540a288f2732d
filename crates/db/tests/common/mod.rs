//! Shared setup for repository integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use stowage_core::{Attachment, FileStore, StorageConfig, StorageService};
use stowage_db::UserRepository;
use stowage_db::migration::Migrator;
use stowage_shared::StorageProvider;

pub const PUBLIC_URL: &str = "https://cdn.test";

pub struct TestContext {
    pub db: DatabaseConnection,
    pub store: Arc<StorageService>,
    pub users: UserRepository,
}

impl TestContext {
    pub async fn exists(&self, name: &str) -> bool {
        self.store.exists(name).await
    }
}

/// Migrated in-memory database plus an in-memory file store.
///
/// The pool holds a single connection, so the database lives as long as the
/// context and queries must not run on `db` while a unit of work is open.
pub async fn setup() -> TestContext {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let config = StorageConfig::new(StorageProvider::Memory).with_public_url(PUBLIC_URL);
    let store = Arc::new(StorageService::from_config(config).expect("memory store"));
    let users = UserRepository::with_store(db.clone(), Arc::clone(&store));

    TestContext { db, store, users }
}

pub fn image(original_name: &str) -> Attachment {
    Attachment::from_bytes(Bytes::from_static(b"\x89PNG fake"), original_name)
}
