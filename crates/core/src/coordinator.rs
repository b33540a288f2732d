//! Attachment consistency coordinator.
//!
//! Sequences file-store writes and deletes around database statements so the
//! pair (row, stored file) changes as one unit even though only the database
//! is transactional:
//!
//! - new files are written before the statement; a failed write aborts it
//! - superseded files are deleted only once the statement is durable, either
//!   right away or from a commit hook
//! - files written for a statement that never became durable are removed,
//!   right away on failure or from a rollback hook
//!
//! Cleanup failures are logged and never surface to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;

use crate::attachment::{AttachmentColumn, AttachmentError};
use crate::lifecycle::{AttachmentModel, LifecycleBus, LifecycleEvent, LifecycleListener};
use crate::storage::{FileStore, StorageError};
use crate::tracker::AttachmentTracker;
use crate::transaction::TransactionHooks;

/// Keeps attachment files consistent with the rows referencing them.
pub struct AttachmentCoordinator<S> {
    store: Arc<S>,
    columns: Vec<AttachmentColumn>,
}

impl<S: FileStore + 'static> AttachmentCoordinator<S> {
    /// Create a coordinator for the given columns.
    #[must_use]
    pub fn new(store: Arc<S>, columns: impl Into<Vec<AttachmentColumn>>) -> Self {
        Self {
            store,
            columns: columns.into(),
        }
    }

    /// Create a coordinator for the columns declared by `M`.
    #[must_use]
    pub fn for_model<M: AttachmentModel>(store: Arc<S>) -> Self {
        Self::new(store, M::attachment_columns())
    }

    /// Build a coordinator for `M` and subscribe it to `bus`.
    pub fn attach<M: AttachmentModel + 'static>(
        store: Arc<S>,
        bus: &mut LifecycleBus<M>,
    ) -> Arc<Self> {
        let coordinator = Arc::new(Self::for_model::<M>(store));
        bus.subscribe(Arc::clone(&coordinator) as Arc<dyn LifecycleListener<M>>);
        coordinator
    }

    /// Columns handled by this coordinator.
    #[must_use]
    pub fn columns(&self) -> &[AttachmentColumn] {
        &self.columns
    }

    /// The file store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Write every pending file before the statement runs.
    ///
    /// Columns are written concurrently. On the first failure all files
    /// written in this phase are removed and the error is returned, so the
    /// statement never runs.
    pub async fn before_save(&self, tracker: &AttachmentTracker) -> Result<(), AttachmentError> {
        let results = join_all(
            self.columns
                .iter()
                .map(|column| self.write_column(tracker, column)),
        )
        .await;

        let Some(err) = results.into_iter().find_map(Result::err) else {
            return Ok(());
        };

        for column in &self.columns {
            let written = tracker.revert_written(column.name);
            delete_quietly(self.store.as_ref(), &written).await;
        }
        Err(err.into())
    }

    async fn write_column(
        &self,
        tracker: &AttachmentTracker,
        column: &AttachmentColumn,
    ) -> Result<(), StorageError> {
        for (name, bytes) in tracker.pending_writes(column.name, column.folder) {
            self.store.write(&name, bytes).await?;
            tracker.mark_written(column.name, &name);
            tracing::debug!(column = column.name, name = %name, "attachment written");
        }
        Ok(())
    }

    /// Settle files once the statement succeeded.
    ///
    /// Without an active transaction superseded files go now and the tracker
    /// advances. Inside one, the same happens from a commit hook, and a
    /// rollback hook removes the files this save wrote.
    pub async fn after_save(&self, tracker: &AttachmentTracker, tx: Option<&dyn TransactionHooks>) {
        let tx = tx.filter(|tx| tx.is_active());

        for column in &self.columns {
            let name = column.name;
            let Some((durable, next)) = tracker.diff(name) else {
                continue;
            };
            let written = tracker.take_written(name);
            let superseded = durable.names_not_in(&next);

            let Some(tx) = tx else {
                delete_quietly(self.store.as_ref(), &superseded).await;
                tracker.commit(name);
                continue;
            };

            let Some(staged) = tracker.stage(name) else {
                continue;
            };

            tracing::trace!(
                column = name,
                superseded = superseded.len(),
                written = written.len(),
                "deferring attachment cleanup"
            );

            let store = Arc::clone(&self.store);
            let on_commit = tracker.clone();
            let committed = staged.clone();
            tx.on_commit(Box::new(move || {
                async move {
                    delete_quietly(store.as_ref(), &superseded).await;
                    on_commit.commit_staged(name, committed);
                }
                .boxed()
            }));

            let store = Arc::clone(&self.store);
            let on_rollback = tracker.clone();
            tx.on_rollback(Box::new(move || {
                async move {
                    delete_quietly(store.as_ref(), &written).await;
                    on_rollback.discard_staged(name, &staged);
                }
                .boxed()
            }));
        }
    }

    /// The statement failed: remove the files written for it.
    pub async fn save_failed(&self, tracker: &AttachmentTracker) {
        for column in &self.columns {
            let written = tracker.revert_written(column.name);
            delete_quietly(self.store.as_ref(), &written).await;
        }
    }

    /// Remove the stored files of a deleted row, now or on commit.
    ///
    /// A rollback leaves the row in place, so nothing is registered for it.
    pub async fn after_delete(&self, tracker: &AttachmentTracker, tx: Option<&dyn TransactionHooks>) {
        let tx = tx.filter(|tx| tx.is_active());

        for column in &self.columns {
            let stored = tracker.durable(column.name).names();
            if stored.is_empty() {
                continue;
            }

            match tx {
                None => delete_quietly(self.store.as_ref(), &stored).await,
                Some(tx) => {
                    let store = Arc::clone(&self.store);
                    tx.on_commit(Box::new(move || {
                        async move { delete_quietly(store.as_ref(), &stored).await }.boxed()
                    }));
                }
            }
        }
    }

    /// Resolve URLs for columns with precomputation enabled.
    pub async fn after_fetch(&self, tracker: &AttachmentTracker) -> Result<(), AttachmentError> {
        for column in self.columns.iter().filter(|c| c.pre_compute_url) {
            let names = tracker.durable(column.name).names();
            if names.is_empty() {
                continue;
            }

            let mut urls = HashMap::with_capacity(names.len());
            for name in names {
                let url = self.store.url(&name).await?;
                urls.insert(name, url);
            }
            tracker.apply_urls(column.name, &urls);
        }
        Ok(())
    }
}

#[async_trait]
impl<M, S> LifecycleListener<M> for AttachmentCoordinator<S>
where
    M: AttachmentModel,
    S: FileStore + 'static,
{
    async fn on_event(
        &self,
        event: LifecycleEvent,
        model: &M,
        tx: Option<&dyn TransactionHooks>,
    ) -> Result<(), AttachmentError> {
        let tracker = model.attachments();
        match event {
            LifecycleEvent::BeforeCreate | LifecycleEvent::BeforeUpdate => {
                self.before_save(tracker).await
            }
            LifecycleEvent::AfterCreate | LifecycleEvent::AfterUpdate => {
                self.after_save(tracker, tx).await;
                Ok(())
            }
            LifecycleEvent::PersistFailed => {
                self.save_failed(tracker).await;
                Ok(())
            }
            LifecycleEvent::BeforeDelete => Ok(()),
            LifecycleEvent::AfterDelete => {
                self.after_delete(tracker, tx).await;
                Ok(())
            }
            LifecycleEvent::Fetched => self.after_fetch(tracker).await,
        }
    }
}

impl<S> std::fmt::Debug for AttachmentCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentCoordinator")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Best-effort delete: failures are logged, never returned.
async fn delete_quietly<S: FileStore>(store: &S, names: &[String]) {
    for name in names {
        if let Err(e) = store.delete(name).await {
            tracing::warn!(name = %name, error = %e, "failed to delete attachment, leaving orphan");
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "coordinator_props.rs"]
mod props;
