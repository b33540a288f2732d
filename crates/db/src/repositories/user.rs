//! User repository for database operations.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::FutureExt;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryOrder,
};
use stowage_core::{
    AttachmentCoordinator, FileStore, LifecycleBus, LifecycleEvent, TransactionHooks,
};
use stowage_shared::{PageRequest, PageResponse};
use uuid::Uuid;

use crate::entities::users;
use crate::error::RepositoryError;
use crate::models::User;
use crate::unit_of_work::UnitOfWork;

/// User repository for CRUD operations.
///
/// Each write is bracketed by lifecycle events: `Before*`, the statement,
/// then `After*` on success or `PersistFailed` on a database error. Reads
/// fire `Fetched` for every returned user.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
    events: LifecycleBus<User>,
}

impl UserRepository {
    /// Creates a repository firing events on `events`.
    #[must_use]
    pub fn new(db: DatabaseConnection, events: LifecycleBus<User>) -> Self {
        Self { db, events }
    }

    /// Creates a repository whose attachments are kept in `store`.
    #[must_use]
    pub fn with_store<S: FileStore + 'static>(db: DatabaseConnection, store: Arc<S>) -> Self {
        let mut events = LifecycleBus::new();
        AttachmentCoordinator::attach(store, &mut events);
        Self::new(db, events)
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, a column is malformed or a URL
    /// cannot be computed.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.find_by_id_on(&self.db, id).await
    }

    /// Finds a user by ID inside a unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, a column is malformed or a URL
    /// cannot be computed.
    pub async fn find_by_id_in(
        &self,
        uow: &UnitOfWork,
        id: Uuid,
    ) -> Result<Option<User>, RepositoryError> {
        self.find_by_id_on(uow.transaction(), id).await
    }

    /// Lists all users ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, a column is malformed or a URL
    /// cannot be computed.
    pub async fn all(&self) -> Result<Vec<User>, RepositoryError> {
        let models = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.db)
            .await?;

        self.hydrate(models).await
    }

    /// Lists one page of users ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, a column is malformed or a URL
    /// cannot be computed.
    pub async fn paginate(
        &self,
        request: PageRequest,
    ) -> Result<PageResponse<User>, RepositoryError> {
        let paginator = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .paginate(&self.db, request.limit());

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(request.index()).await?;
        let data = self.hydrate(models).await?;

        Ok(PageResponse::new(data, request, total))
    }

    /// Inserts or updates a user outside any transaction.
    ///
    /// Superseded files are deleted as soon as the statement succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written (nothing is persisted)
    /// or the statement fails (new files are removed).
    pub async fn save(&self, user: &mut User) -> Result<(), RepositoryError> {
        self.persist(&self.db, None, user).await
    }

    /// Inserts or updates a user inside a unit of work.
    ///
    /// Superseded files are deleted when `uow` commits; files written here
    /// are removed if it rolls back.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written (nothing is persisted)
    /// or the statement fails (new files are removed).
    pub async fn save_in(&self, uow: &UnitOfWork, user: &mut User) -> Result<(), RepositoryError> {
        self.persist(uow.transaction(), Some(uow.as_hooks()), user).await
    }

    /// Deletes a user and its stored files.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or no row matched.
    pub async fn delete(&self, user: &User) -> Result<(), RepositoryError> {
        self.remove(&self.db, None, user).await
    }

    /// Deletes a user inside a unit of work. Files go once `uow` commits.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails or no row matched.
    pub async fn delete_in(&self, uow: &UnitOfWork, user: &User) -> Result<(), RepositoryError> {
        self.remove(uow.transaction(), Some(uow.as_hooks()), user).await
    }

    async fn find_by_id_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<User>, RepositoryError> {
        let Some(model) = users::Entity::find_by_id(id).one(conn).await? else {
            return Ok(None);
        };

        let user = User::from_model(model)?;
        self.events
            .emit(LifecycleEvent::Fetched, &user, None)
            .await?;
        Ok(Some(user))
    }

    async fn hydrate(&self, models: Vec<users::Model>) -> Result<Vec<User>, RepositoryError> {
        let users = models
            .into_iter()
            .map(User::from_model)
            .collect::<Result<Vec<_>, _>>()?;

        self.events.emit_fetched(&users).await?;
        Ok(users)
    }

    async fn persist<C: ConnectionTrait>(
        &self,
        conn: &C,
        tx: Option<&dyn TransactionHooks>,
        user: &mut User,
    ) -> Result<(), RepositoryError> {
        let creating = !user.is_persisted();
        let (before, after) = if creating {
            (LifecycleEvent::BeforeCreate, LifecycleEvent::AfterCreate)
        } else {
            (LifecycleEvent::BeforeUpdate, LifecycleEvent::AfterUpdate)
        };

        self.events.emit(before, user, tx).await?;

        if let Err(e) = write_row(conn, user, creating).await {
            tracing::debug!(user_id = %user.id(), error = %e, "user statement failed");
            let failed = self.events.emit(LifecycleEvent::PersistFailed, user, tx);
            if let Err(cleanup) = failed.await {
                tracing::warn!(
                    user_id = %user.id(),
                    error = %cleanup,
                    "listener failed after statement error"
                );
            }
            return Err(e.into());
        }

        user.mark_persisted();
        if creating {
            forget_insert_on_rollback(tx, user);
        }
        self.events.emit(after, user, tx).await?;
        Ok(())
    }

    async fn remove<C: ConnectionTrait>(
        &self,
        conn: &C,
        tx: Option<&dyn TransactionHooks>,
        user: &User,
    ) -> Result<(), RepositoryError> {
        self.events
            .emit(LifecycleEvent::BeforeDelete, user, tx)
            .await?;

        let result = users::Entity::delete_by_id(user.id()).exec(conn).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.events
            .emit(LifecycleEvent::AfterDelete, user, tx)
            .await?;
        Ok(())
    }
}

/// A rolled-back insert leaves no row, so the next save must insert again.
fn forget_insert_on_rollback(tx: Option<&dyn TransactionHooks>, user: &User) {
    let Some(tx) = tx.filter(|tx| tx.is_active()) else {
        return;
    };
    let persisted = user.persisted_flag();
    tx.on_rollback(Box::new(move || {
        async move { persisted.store(false, Ordering::SeqCst) }.boxed()
    }));
}

async fn write_row<C: ConnectionTrait>(conn: &C, user: &User, creating: bool) -> Result<(), DbErr> {
    let model = user.to_active_model();
    if creating {
        users::Entity::insert(model).exec_without_returning(conn).await?;
    } else {
        model.update(conn).await?;
    }
    Ok(())
}
