//! Core attachment logic for Stowage.
//!
//! This crate keeps file attachments consistent with the database rows that
//! reference them. It has no database dependency: the persistence layer fires
//! lifecycle events and hands over transaction hooks, everything else lives here.
//!
//! # Modules
//!
//! - `attachment` - Attachment metadata, column configuration and values
//! - `storage` - File store port and the OpenDAL-backed implementation
//! - `tracker` - Per-instance old/new bookkeeping of attachment columns
//! - `transaction` - Commit and rollback hook registry
//! - `lifecycle` - Model lifecycle events and listeners
//! - `coordinator` - Sequencing of file writes and deletes around statements

pub mod attachment;
pub mod coordinator;
pub mod lifecycle;
pub mod storage;
pub mod tracker;
pub mod transaction;

pub use attachment::{Attachment, AttachmentColumn, AttachmentError, ColumnValue};
pub use coordinator::AttachmentCoordinator;
pub use lifecycle::{AttachmentModel, LifecycleBus, LifecycleEvent, LifecycleListener};
pub use storage::{FileStore, StorageConfig, StorageError, StorageService};
pub use tracker::{AttachmentTracker, StagedValue};
pub use transaction::{Hook, TransactionContext, TransactionHooks, TransactionState};
