//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{CacheStore, Database, Mailer, OAuthProvider};
use crate::services::{AuthService, EventService, ServiceContainer, Services, UserService};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub event_service: Arc<dyn EventService>,
    /// Redis cache (rate limiting, health)
    pub cache: Arc<dyn CacheStore>,
    pub database: Arc<Database>,
    /// Cookie policy and frontend redirect base
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the state by wiring services through the `Services` container.
    pub fn from_config(
        database: Arc<Database>,
        cache: Arc<dyn CacheStore>,
        mailer: Arc<dyn Mailer>,
        oauth: Option<Arc<dyn OAuthProvider>>,
        config: Config,
    ) -> Self {
        let container = Services::from_connection(
            database.get_connection(),
            cache.clone(),
            mailer,
            oauth,
            config.clone(),
        );

        Self {
            auth_service: container.auth(),
            user_service: container.users(),
            event_service: container.events(),
            cache,
            database,
            config: Arc::new(config),
        }
    }

    /// Create application state with manually injected services (tests, tooling).
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        event_service: Arc<dyn EventService>,
        cache: Arc<dyn CacheStore>,
        database: Arc<Database>,
        config: Config,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            event_service,
            cache,
            database,
            config: Arc::new(config),
        }
    }
}
