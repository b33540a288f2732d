//! Object storage for attachment bytes using Apache OpenDAL.
//!
//! The consistency core only talks to the [`FileStore`] port. [`StorageService`]
//! is the production adapter and supports:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//! - Process memory (tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      FileStore (port)                           │
//! │        write(path, bytes) │ delete(path) │ exists │ url         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      Apache OpenDAL                             │
//! │ op.write("key", data)      │ op.presign_read("key", duration)   │
//! │ op.delete("key")           │ op.stat("key")                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod service;
mod store;

pub use config::StorageConfig;
pub use error::StorageError;
pub use service::StorageService;
pub use store::FileStore;
pub use stowage_shared::StorageProvider;
