//! Fixtures shared by service unit tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, MockExecResult};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{AuthProvider, Event, Password, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::{
    EventRepository, MockEventRepository, MockUserRepository, Persistence, TransactionContext,
    TxFuture, UnitOfWork, UserRepository,
};

/// Unit of work over repository mocks. Transactions run against a sea-orm
/// mock connection when one is attached and fail otherwise.
pub struct MockUow {
    pub users: Arc<MockUserRepository>,
    pub events: Arc<MockEventRepository>,
    database: Option<Persistence>,
}

impl MockUow {
    pub fn new(users: MockUserRepository, events: MockEventRepository) -> Arc<Self> {
        Arc::new(Self {
            users: Arc::new(users),
            events: Arc::new(events),
            database: None,
        })
    }

    /// Repository reads go to `users`; transactions go to `db`.
    pub fn with_database(users: MockUserRepository, db: DatabaseConnection) -> Arc<Self> {
        Arc::new(Self {
            users: Arc::new(users),
            events: Arc::new(MockEventRepository::new()),
            database: Some(Persistence::new(db)),
        })
    }

    pub fn with_users(users: MockUserRepository) -> Arc<Self> {
        Self::new(users, MockEventRepository::new())
    }

    pub fn with_events(events: MockEventRepository) -> Arc<Self> {
        Self::new(MockUserRepository::new(), events)
    }
}

#[async_trait]
impl UnitOfWork for MockUow {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn events(&self) -> Arc<dyn EventRepository> {
        self.events.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        match &self.database {
            Some(persistence) => persistence.transaction(f).await,
            None => Err(AppError::internal("no database in unit tests")),
        }
    }
}

/// Outcome of one `UPDATE` against the mock connection
pub fn rows_affected(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

/// Every statement the mock connection saw, transaction markers included
pub fn logged_sql(db: DatabaseConnection) -> Vec<String> {
    db.into_transaction_log()
        .iter()
        .flat_map(|txn| txn.statements().iter().map(|stmt| stmt.sql.clone()))
        .collect()
}

pub fn test_config() -> Config {
    Config::new("unit-test-secret-that-is-long-enough!!").unwrap()
}

pub fn user(email: &str, password: Option<&str>) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: password.map(|p| Password::new(p).unwrap().into_string()),
        name: Some("Test User".to_string()),
        role: UserRole::Attendee,
        provider: if password.is_some() {
            AuthProvider::Local
        } else {
            AuthProvider::Google
        },
        provider_id: None,
        is_verified: true,
        is_profile_complete: true,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

pub fn event(organizer_id: Uuid) -> Event {
    let start = Utc::now() + Duration::days(7);
    Event {
        id: 1,
        public_id: Uuid::new_v4(),
        title: "RustConf".to_string(),
        description: "Rust talks".to_string(),
        long_description: None,
        category: "Tech".to_string(),
        date: start,
        start_time: start,
        end_time: start + Duration::hours(8),
        venue: "Hall A".to_string(),
        poster_url: None,
        price: 0,
        prize_pool: None,
        prize_description: None,
        capacity: Some(100),
        organizer_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}
