//! Transaction hook registry.
//!
//! A [`TransactionContext`] travels next to a database transaction and holds
//! the ordered commit and rollback hooks registered while it was open. The
//! persistence layer resolves it exactly once, after the database outcome is
//! known, which drains one of the two lists in registration order.
//!
//! Savepoints are child contexts. Committing a savepoint hands its hooks to
//! the parent, so they only fire once the outermost transaction resolves.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;

/// Deferred action run when a transaction resolves.
pub type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Capability to defer work until a transaction resolves.
pub trait TransactionHooks: Send + Sync {
    /// Run `hook` after a successful commit.
    fn on_commit(&self, hook: Hook);

    /// Run `hook` after a rollback.
    fn on_rollback(&self, hook: Hook);

    /// Whether the transaction is still open.
    fn is_active(&self) -> bool;
}

/// Resolution state of a transaction context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Open; hooks may be registered.
    Active,
    /// Committed; commit hooks ran or moved to the parent.
    Committed,
    /// Rolled back; rollback hooks ran.
    RolledBack,
}

#[derive(Default)]
struct HookQueue {
    resolved: Option<TransactionState>,
    on_commit: Vec<Hook>,
    on_rollback: Vec<Hook>,
}

/// Ordered commit/rollback hooks for one transaction or savepoint.
#[derive(Clone, Default)]
pub struct TransactionContext {
    queue: Arc<Mutex<HookQueue>>,
    parent: Option<Box<TransactionContext>>,
}

impl TransactionContext {
    /// Create a context for a new top-level transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child context for a savepoint inside this transaction.
    #[must_use]
    pub fn savepoint(&self) -> Self {
        Self {
            queue: Arc::default(),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Current resolution state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.lock().resolved.unwrap_or(TransactionState::Active)
    }

    /// Number of hooks waiting as `(commit, rollback)`.
    #[must_use]
    pub fn pending_hooks(&self) -> (usize, usize) {
        let queue = self.lock();
        (queue.on_commit.len(), queue.on_rollback.len())
    }

    /// Resolve as committed.
    ///
    /// A savepoint forwards its hooks to the parent; a top-level transaction
    /// runs its commit hooks in order and drops its rollback hooks.
    pub async fn commit(&self) {
        let Some((on_commit, on_rollback)) = self.resolve(TransactionState::Committed) else {
            return;
        };

        match &self.parent {
            Some(parent) => {
                tracing::trace!(
                    commit = on_commit.len(),
                    rollback = on_rollback.len(),
                    "savepoint released, forwarding hooks"
                );
                for hook in on_commit {
                    parent.on_commit(hook);
                }
                for hook in on_rollback {
                    parent.on_rollback(hook);
                }
            }
            None => run(on_commit).await,
        }
    }

    /// Resolve as rolled back, running the rollback hooks in order.
    pub async fn rollback(&self) {
        if let Some((_, on_rollback)) = self.resolve(TransactionState::RolledBack) {
            run(on_rollback).await;
        }
    }

    /// Mark resolved and take the hook lists. `None` if already resolved.
    fn resolve(&self, state: TransactionState) -> Option<(Vec<Hook>, Vec<Hook>)> {
        let mut queue = self.lock();
        if queue.resolved.is_some() {
            tracing::warn!(?state, "transaction context resolved twice, ignoring");
            return None;
        }
        queue.resolved = Some(state);
        Some((
            std::mem::take(&mut queue.on_commit),
            std::mem::take(&mut queue.on_rollback),
        ))
    }

    fn lock(&self) -> MutexGuard<'_, HookQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, hook: Hook, commit: bool) {
        let mut queue = self.lock();
        if queue.resolved.is_some() {
            tracing::warn!("hook registered on a resolved transaction, dropping");
            return;
        }
        if commit {
            queue.on_commit.push(hook);
        } else {
            queue.on_rollback.push(hook);
        }
    }
}

impl TransactionHooks for TransactionContext {
    fn on_commit(&self, hook: Hook) {
        self.push(hook, true);
    }

    fn on_rollback(&self, hook: Hook) {
        self.push(hook, false);
    }

    fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (commit, rollback) = self.pending_hooks();
        f.debug_struct("TransactionContext")
            .field("state", &self.state())
            .field("on_commit", &commit)
            .field("on_rollback", &rollback)
            .field("savepoint", &self.parent.is_some())
            .finish()
    }
}

async fn run(hooks: Vec<Hook>) {
    for hook in hooks {
        hook().await;
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Hook) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |label: &'static str| -> Hook {
            let sink = Arc::clone(&sink);
            Box::new(move || {
                async move {
                    sink.lock().unwrap().push(label);
                }
                .boxed()
            })
        };
        (log, make)
    }

    #[tokio::test]
    async fn test_commit_runs_commit_hooks_in_order() {
        let (log, hook) = recorder();
        let tx = TransactionContext::new();

        tx.on_commit(hook("first"));
        tx.on_rollback(hook("undo"));
        tx.on_commit(hook("second"));
        tx.commit().await;

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(tx.state(), TransactionState::Committed);
        assert!(!tx.is_active());
    }

    #[tokio::test]
    async fn test_rollback_runs_rollback_hooks_only() {
        let (log, hook) = recorder();
        let tx = TransactionContext::new();

        tx.on_commit(hook("apply"));
        tx.on_rollback(hook("undo-a"));
        tx.on_rollback(hook("undo-b"));
        tx.rollback().await;

        assert_eq!(*log.lock().unwrap(), vec!["undo-a", "undo-b"]);
        assert_eq!(tx.state(), TransactionState::RolledBack);
    }

    #[tokio::test]
    async fn test_resolving_twice_is_ignored() {
        let (log, hook) = recorder();
        let tx = TransactionContext::new();

        tx.on_commit(hook("apply"));
        tx.commit().await;
        tx.rollback().await;
        tx.commit().await;

        assert_eq!(*log.lock().unwrap(), vec!["apply"]);
        assert_eq!(tx.state(), TransactionState::Committed);
    }

    #[tokio::test]
    async fn test_hooks_after_resolution_are_dropped() {
        let (log, hook) = recorder();
        let tx = TransactionContext::new();
        tx.commit().await;

        tx.on_commit(hook("late"));
        assert_eq!(tx.pending_hooks(), (0, 0));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_savepoint_commit_defers_to_parent() {
        let (log, hook) = recorder();
        let tx = TransactionContext::new();
        let savepoint = tx.savepoint();

        savepoint.on_commit(hook("inner-apply"));
        savepoint.on_rollback(hook("inner-undo"));
        savepoint.commit().await;

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(tx.pending_hooks(), (1, 1));

        tx.rollback().await;
        assert_eq!(*log.lock().unwrap(), vec!["inner-undo"]);
    }

    #[tokio::test]
    async fn test_savepoint_rollback_fires_immediately() {
        let (log, hook) = recorder();
        let tx = TransactionContext::new();
        let savepoint = tx.savepoint();

        savepoint.on_commit(hook("inner-apply"));
        savepoint.on_rollback(hook("inner-undo"));
        savepoint.rollback().await;

        assert_eq!(*log.lock().unwrap(), vec!["inner-undo"]);
        assert!(tx.is_active());
        assert_eq!(tx.pending_hooks(), (0, 0));

        tx.commit().await;
        assert_eq!(*log.lock().unwrap(), vec!["inner-undo"]);
    }

    #[tokio::test]
    async fn test_shared_context_accumulates_across_callers() {
        let (log, hook) = recorder();
        let tx = TransactionContext::new();
        let other_handle = tx.clone();

        tx.on_commit(hook("user-1"));
        other_handle.on_commit(hook("user-2"));
        tx.commit().await;

        assert_eq!(*log.lock().unwrap(), vec!["user-1", "user-2"]);
        assert!(!other_handle.is_active());
    }
}
