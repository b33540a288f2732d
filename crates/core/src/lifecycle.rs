//! Model lifecycle events.
//!
//! The persistence layer owns a [`LifecycleBus`] per entity type and fires
//! events around every statement it runs. Listeners subscribe once when the
//! entity is set up.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::attachment::{AttachmentColumn, AttachmentError};
use crate::tracker::AttachmentTracker;
use crate::transaction::TransactionHooks;

/// Entity carrying attachment columns.
pub trait AttachmentModel: Send + Sync {
    /// Attachment columns declared by the entity schema.
    fn attachment_columns() -> &'static [AttachmentColumn]
    where
        Self: Sized;

    /// Old/new state of this instance's attachment columns.
    fn attachments(&self) -> &AttachmentTracker;
}

/// Persistence events fired for one model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An insert is about to run.
    BeforeCreate,
    /// The insert succeeded.
    AfterCreate,
    /// An update is about to run.
    BeforeUpdate,
    /// The update succeeded.
    AfterUpdate,
    /// The insert or update statement failed.
    PersistFailed,
    /// A delete is about to run.
    BeforeDelete,
    /// The delete succeeded.
    AfterDelete,
    /// The instance was loaded by a find, list or paginate query.
    Fetched,
}

impl LifecycleEvent {
    /// Whether the event precedes a write statement.
    #[must_use]
    pub fn is_before_save(self) -> bool {
        matches!(self, Self::BeforeCreate | Self::BeforeUpdate)
    }

    /// Whether the event follows a successful write statement.
    #[must_use]
    pub fn is_after_save(self) -> bool {
        matches!(self, Self::AfterCreate | Self::AfterUpdate)
    }
}

/// Subscriber to lifecycle events of models of type `M`.
#[async_trait]
pub trait LifecycleListener<M>: Send + Sync {
    /// Handle one event. An error from a "before" event aborts the statement.
    async fn on_event(
        &self,
        event: LifecycleEvent,
        model: &M,
        tx: Option<&dyn TransactionHooks>,
    ) -> Result<(), AttachmentError>;
}

/// Ordered listeners for one entity type.
pub struct LifecycleBus<M> {
    listeners: Vec<Arc<dyn LifecycleListener<M>>>,
}

impl<M> Default for LifecycleBus<M> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<M> Clone for LifecycleBus<M> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<M: Sync> LifecycleBus<M> {
    /// Create a bus without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners run in subscription order.
    pub fn subscribe(&mut self, listener: Arc<dyn LifecycleListener<M>>) {
        self.listeners.push(listener);
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if nobody listens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener, stopping at the first error.
    pub async fn emit(
        &self,
        event: LifecycleEvent,
        model: &M,
        tx: Option<&dyn TransactionHooks>,
    ) -> Result<(), AttachmentError> {
        for listener in &self.listeners {
            listener.on_event(event, model, tx).await?;
        }
        Ok(())
    }

    /// Deliver [`LifecycleEvent::Fetched`] for every loaded model.
    pub async fn emit_fetched(&self, models: &[M]) -> Result<(), AttachmentError> {
        for model in models {
            self.emit(LifecycleEvent::Fetched, model, None).await?;
        }
        Ok(())
    }
}

impl<M> fmt::Debug for LifecycleBus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
