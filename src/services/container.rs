//! Service Container - Centralized service access with parallel execution support.

use std::future::Future;
use std::sync::Arc;

use super::{AuthService, EventService, UserService};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{CacheStore, Mailer, OAuthProvider, Persistence};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn events(&self) -> Arc<dyn EventService>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    user_service: Arc<dyn UserService>,
    event_service: Arc<dyn EventService>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        event_service: Arc<dyn EventService>,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            event_service,
        }
    }

    /// Wire every service over one database connection and the shared adapters.
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        cache: Arc<dyn CacheStore>,
        mailer: Arc<dyn Mailer>,
        oauth: Option<Arc<dyn OAuthProvider>>,
        config: Config,
    ) -> Self {
        use super::{Authenticator, EventManager, UserManager};

        let uow = Arc::new(Persistence::new(db));
        let auth_service = Arc::new(Authenticator::new(
            uow.clone(),
            cache,
            mailer,
            oauth,
            config,
        ));
        let user_service = Arc::new(UserManager::new(uow.clone()));
        let event_service = Arc::new(EventManager::new(uow));

        Self {
            auth_service,
            user_service,
            event_service,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn events(&self) -> Arc<dyn EventService> {
        self.event_service.clone()
    }
}

/// Parallel execution utilities for running independent operations concurrently.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// Execute two independent async operations in parallel.
    ///
    /// Both operations run concurrently and the function returns when both complete.
    /// If either operation fails, the error is returned immediately.
    ///
    /// # Example
    /// ```ignore
    /// let (total, events) = parallel::join2(
    ///     repo.count(filter.clone()),
    ///     repo.list(filter, params),
    /// ).await?;
    /// ```
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn test_parallel_join2() {
        async fn op1() -> AppResult<i32> {
            Ok(1)
        }
        async fn op2() -> AppResult<&'static str> {
            Ok("two")
        }

        let (a, b) = parallel::join2(op1(), op2()).await.unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, "two");
    }

    #[tokio::test]
    async fn test_parallel_join2_propagates_error() {
        async fn ok() -> AppResult<i32> {
            Ok(1)
        }
        async fn fail() -> AppResult<i32> {
            Err(AppError::not_found("Event"))
        }

        let result = parallel::join2(ok(), fail()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
