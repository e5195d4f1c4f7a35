//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections, migrations and repositories
//! - Redis for short-lived codes and rate limiting
//! - SMTP delivery and the Google OAuth client
//! - Unit of Work for transaction management

pub mod cache;
pub mod db;
pub mod mailer;
pub mod oauth;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, CacheStore};
pub use db::{Database, Migrator};
pub use mailer::{mailer_from_config, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
pub use oauth::{GoogleOAuth, OAuthProvider};
pub use repositories::{EventRepository, EventStore, UserRepository, UserStore};
pub use unit_of_work::{
    Persistence, TransactionContext, TxEventRepository, TxFuture, TxUserRepository, UnitOfWork,
};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockCacheStore;
#[cfg(any(test, feature = "test-utils"))]
pub use mailer::MockMailer;
#[cfg(any(test, feature = "test-utils"))]
pub use oauth::MockOAuthProvider;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockEventRepository, MockUserRepository};
