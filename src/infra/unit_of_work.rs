//! Unit of Work: repository access plus transaction management.
//!
//! Work that spans users and events (account removal) runs through
//! [`UnitOfWork::transaction`] so both tables change together or not at all.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    AccessMode, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IsolationLevel, QueryFilter, TransactionTrait,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::entities::{event, user};
use super::repositories::{EventRepository, EventStore, UserRepository, UserStore};
use crate::errors::{AppError, AppResult};

/// Boxed future returned by transactional closures
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because `transaction` is generic; tests provide a
/// small hand-written implementation instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn events(&self) -> Arc<dyn EventRepository>;

    /// Run `f` inside a ReadCommitted transaction. Commits on `Ok`, rolls back on `Err`.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Repository access bound to one open transaction
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository { txn: self.txn }
    }

    pub fn events(&self) -> TxEventRepository<'_> {
        TxEventRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    event_repo: Arc<EventStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        let user_repo = Arc::new(UserStore::new(db.clone()));
        let event_repo = Arc::new(EventStore::new(db.clone()));
        Self {
            db,
            user_repo,
            event_repo,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn events(&self) -> Arc<dyn EventRepository> {
        self.event_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// User writes scoped to a transaction
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxUserRepository<'_> {
    /// Soft delete an active user.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let now = chrono::Utc::now();
        let result = user::Entity::update_many()
            .col_expr(user::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::DeletedAt.is_null())
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }
}

/// Event writes scoped to a transaction
pub struct TxEventRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl TxEventRepository<'_> {
    /// Soft delete every active event owned by `organizer_id`; returns how many.
    pub async fn delete_by_organizer(&self, organizer_id: Uuid) -> AppResult<u64> {
        let now = chrono::Utc::now();
        let result = event::Entity::update_many()
            .col_expr(event::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(event::Column::UpdatedAt, Expr::value(now))
            .filter(event::Column::OrganizerId.eq(organizer_id))
            .filter(event::Column::DeletedAt.is_null())
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_transaction_commits_and_returns_value() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 4,
            }])
            .into_connection();
        let uow = Persistence::new(db.clone());

        let organizer_id = Uuid::new_v4();
        let removed = uow
            .transaction(move |ctx| {
                Box::pin(async move { ctx.events().delete_by_organizer(organizer_id).await })
            })
            .await
            .unwrap();
        assert_eq!(removed, 4);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql: Vec<&str> = log[0].statements().iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(sql.first(), Some(&"BEGIN"));
        assert_eq!(sql.last(), Some(&"COMMIT"));
    }

    #[tokio::test]
    async fn test_missing_user_rolls_back() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let uow = Persistence::new(db.clone());

        let result = uow
            .transaction(move |ctx| {
                Box::pin(async move { ctx.users().delete(Uuid::new_v4()).await })
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let log = db.into_transaction_log();
        let last = log[0].statements().last().map(|s| s.sql.clone());
        assert_eq!(last.as_deref(), Some("ROLLBACK"));
    }
}
