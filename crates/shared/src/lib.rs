//! Shared configuration and pagination types for Stowage.
//!
//! This crate provides common types used across all other crates:
//! - Pagination types for list queries
//! - Configuration management (database and storage sections)

pub mod config;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, StorageProvider, StorageSettings};
pub use types::{PageMeta, PageRequest, PageResponse};
