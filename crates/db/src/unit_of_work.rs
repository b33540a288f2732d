//! Transactions that carry attachment hooks.
//!
//! A [`UnitOfWork`] pairs a `SeaORM` transaction with the
//! [`TransactionContext`] the coordinator registers its deferred file
//! cleanups on. Resolving the unit of work resolves both, database first.
//!
//! # Usage
//!
//! ```ignore
//! use stowage_db::UnitOfWork;
//!
//! let uow = UnitOfWork::begin(&db).await?;
//! users.save_in(&uow, &mut alice).await?;
//! users.delete_in(&uow, &bob).await?;
//!
//! // Superseded files are removed only once the commit succeeded
//! uow.commit().await?;
//! ```

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use stowage_core::{TransactionContext, TransactionHooks};

/// A database transaction together with its commit and rollback hooks.
///
/// Dropping a unit of work without resolving it rolls the database
/// transaction back but runs no hooks.
#[derive(Debug)]
pub struct UnitOfWork {
    txn: DatabaseTransaction,
    hooks: TransactionContext,
}

impl UnitOfWork {
    /// Begins a new top-level transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn begin(db: &DatabaseConnection) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        Ok(Self {
            txn,
            hooks: TransactionContext::new(),
        })
    }

    /// Opens a savepoint inside this transaction.
    ///
    /// Hooks registered on the savepoint move to this unit of work when the
    /// savepoint commits, and run right away when it rolls back.
    ///
    /// # Errors
    ///
    /// Returns an error if the savepoint cannot be created.
    pub async fn savepoint(&self) -> Result<Self, DbErr> {
        let txn = self.txn.begin().await?;
        Ok(Self {
            txn,
            hooks: self.hooks.savepoint(),
        })
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Returns the hook context bound to this transaction.
    #[must_use]
    pub fn hooks(&self) -> &TransactionContext {
        &self.hooks
    }

    /// Commits the transaction, then runs the commit hooks.
    ///
    /// If the database refuses the commit nothing became durable, so the
    /// rollback hooks run instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        match self.txn.commit().await {
            Ok(()) => {
                self.hooks.commit().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "commit failed, running rollback hooks");
                self.hooks.rollback().await;
                Err(e)
            }
        }
    }

    /// Rolls back the transaction, then runs the rollback hooks.
    ///
    /// The hooks run even if the database reports an error, since the
    /// transaction is gone either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        let result = self.txn.rollback().await;
        self.hooks.rollback().await;
        result
    }

    pub(crate) fn as_hooks(&self) -> &dyn TransactionHooks {
        &self.hooks
    }
}
