//! User service - account lookup, updates and self-service deletion.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Actor, Password, User, UserChanges, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;

use super::auth_service::normalize_email;

/// Changes requested through `PUT /users`
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub email: String,
    pub new_role: Option<UserRole>,
    pub new_password: Option<String>,
}

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get active user by ID
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Update the account named by `update.email`.
    ///
    /// Callers may update themselves; admins may update anyone. Only admins
    /// may change a role.
    async fn update_account(&self, actor: &Actor, update: AccountUpdate) -> AppResult<User>;

    /// Soft delete the caller's own account and every event it organizes.
    async fn delete_account(&self, actor: &Actor, email: String, password: String)
        -> AppResult<()>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id(id)
            .await?
            .ok_or_not_found("User")
    }

    async fn update_account(&self, actor: &Actor, update: AccountUpdate) -> AppResult<User> {
        let email = normalize_email(&update.email);
        if email.is_empty() {
            return Err(AppError::bad_request("Email is required"));
        }
        if update.new_role.is_none() && update.new_password.is_none() {
            return Err(AppError::bad_request("New role or password is required"));
        }

        let is_self = email == normalize_email(&actor.email);
        if !is_self && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        if update.new_role.is_some() && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }

        let password_hash = match update.new_password.as_deref() {
            Some(plain) => Some(Password::new(plain)?.into_string()),
            None => None,
        };

        let users = self.uow.users();
        let target = users.find_by_email(&email).await?.ok_or_not_found("User")?;

        let changes = UserChanges {
            password_hash,
            role: update.new_role,
            ..Default::default()
        };
        let user = users.update(target.id, changes).await?;

        tracing::info!(
            actor_id = %actor.id,
            user_id = %user.id,
            role_changed = update.new_role.is_some(),
            "User updated"
        );
        Ok(user)
    }

    async fn delete_account(
        &self,
        actor: &Actor,
        email: String,
        password: String,
    ) -> AppResult<()> {
        let email = normalize_email(&email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::bad_request("Email and password are required"));
        }
        if email != normalize_email(&actor.email) {
            return Err(AppError::Forbidden);
        }

        let user = self
            .uow
            .users()
            .find_by_id(actor.id)
            .await?
            .ok_or_not_found("User")?;

        if !Password::verify_stored(user.password_hash.as_deref(), &password) {
            return Err(AppError::InvalidCredentials);
        }

        let user_id = user.id;
        let removed_events = self
            .uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    let removed = ctx.events().delete_by_organizer(user_id).await?;
                    ctx.users().delete(user_id).await?;
                    Ok(removed)
                })
            })
            .await?;

        tracing::info!(user_id = %user_id, removed_events, "Account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MockUserRepository;
    use crate::services::test_support::{logged_sql, rows_affected, user, MockUow};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn actor(email: &str, role: UserRole) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let service = UserManager::new(MockUow::with_users(users));
        let result = service.get_user(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_requires_email() {
        let service = UserManager::new(MockUow::with_users(MockUserRepository::new()));
        let update = AccountUpdate {
            email: "  ".to_string(),
            new_password: Some("password123".to_string()),
            ..Default::default()
        };
        let result = service
            .update_account(&actor("a@example.com", UserRole::Attendee), update)
            .await;
        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Email is required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_requires_a_change() {
        let service = UserManager::new(MockUow::with_users(MockUserRepository::new()));
        let update = AccountUpdate {
            email: "a@example.com".to_string(),
            ..Default::default()
        };
        let result = service
            .update_account(&actor("a@example.com", UserRole::Attendee), update)
            .await;
        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "New role or password is required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_admin_cannot_change_role() {
        let service = UserManager::new(MockUow::with_users(MockUserRepository::new()));
        let update = AccountUpdate {
            email: "a@example.com".to_string(),
            new_role: Some(UserRole::Admin),
            new_password: None,
        };
        let result = service
            .update_account(&actor("a@example.com", UserRole::Organizer), update)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_update_others() {
        let service = UserManager::new(MockUow::with_users(MockUserRepository::new()));
        let update = AccountUpdate {
            email: "b@example.com".to_string(),
            new_password: Some("password123".to_string()),
            ..Default::default()
        };
        let result = service
            .update_account(&actor("a@example.com", UserRole::Attendee), update)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_admin_changes_role_of_other_user() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email == "b@example.com")
            .returning(|email| Ok(Some(user(email, None))));
        users
            .expect_update()
            .withf(|_, changes| {
                changes.role == Some(UserRole::Organizer) && changes.password_hash.is_none()
            })
            .times(1)
            .returning(|_, _| {
                let mut u = user("b@example.com", None);
                u.role = UserRole::Organizer;
                Ok(u)
            });

        let service = UserManager::new(MockUow::with_users(users));
        let update = AccountUpdate {
            email: "B@example.com".to_string(),
            new_role: Some(UserRole::Organizer),
            new_password: None,
        };
        let updated = service
            .update_account(&actor("admin@example.com", UserRole::Admin), update)
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::Organizer);
    }

    #[tokio::test]
    async fn test_delete_requires_credentials() {
        let service = UserManager::new(MockUow::with_users(MockUserRepository::new()));
        let result = service
            .delete_account(
                &actor("a@example.com", UserRole::Attendee),
                "a@example.com".to_string(),
                String::new(),
            )
            .await;
        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Email and password are required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_only_own_account() {
        let service = UserManager::new(MockUow::with_users(MockUserRepository::new()));
        let result = service
            .delete_account(
                &actor("admin@example.com", UserRole::Admin),
                "someone@example.com".to_string(),
                "password123".to_string(),
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_delete_wrong_password() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Ok(Some(user("a@example.com", Some("password123")))));

        let service = UserManager::new(MockUow::with_users(users));
        let result = service
            .delete_account(
                &actor("a@example.com", UserRole::Attendee),
                "a@example.com".to_string(),
                "not-my-password".to_string(),
            )
            .await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_delete_removes_events_then_user_in_one_transaction() {
        let owner = actor("a@example.com", UserRole::Organizer);
        let owner_id = owner.id;

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| {
            let mut u = user("a@example.com", Some("password123"));
            u.id = owner_id;
            Ok(Some(u))
        });

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([rows_affected(2), rows_affected(1)])
            .into_connection();
        let service = UserManager::new(MockUow::with_database(users, db.clone()));

        service
            .delete_account(&owner, "A@example.com".to_string(), "password123".to_string())
            .await
            .unwrap();

        let sql = logged_sql(db);
        assert_eq!(sql.len(), 4, "{:?}", sql);
        assert_eq!(sql[0], "BEGIN");
        assert!(sql[1].starts_with(r#"UPDATE "events" SET "deleted_at""#), "{}", sql[1]);
        assert!(sql[2].starts_with(r#"UPDATE "users" SET "deleted_at""#), "{}", sql[2]);
        assert_eq!(sql[3], "COMMIT");
    }

    #[tokio::test]
    async fn test_delete_rolls_back_events_when_user_already_gone() {
        let owner = actor("a@example.com", UserRole::Organizer);

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Ok(Some(user("a@example.com", Some("password123")))));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([rows_affected(3), rows_affected(0)])
            .into_connection();
        let service = UserManager::new(MockUow::with_database(users, db.clone()));

        let result = service
            .delete_account(&owner, "a@example.com".to_string(), "password123".to_string())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let sql = logged_sql(db);
        assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(sql.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!sql.iter().any(|stmt| stmt == "COMMIT"));
    }
}
