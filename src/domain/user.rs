//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ROLE_ADMIN, ROLE_ATTENDEE, ROLE_ORGANIZER};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Attendee,
    Organizer,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Organizers and admins may publish events
    pub fn can_publish_events(&self) -> bool {
        matches!(self, UserRole::Organizer | UserRole::Admin)
    }

    /// Roles a user may pick for themselves while completing their profile
    pub fn is_self_assignable(&self) -> bool {
        !self.is_admin()
    }

    /// Parse a role name, returning `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ROLE_ATTENDEE => Some(UserRole::Attendee),
            ROLE_ORGANIZER => Some(UserRole::Organizer),
            ROLE_ADMIN => Some(UserRole::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Attendee => ROLE_ATTENDEE,
            UserRole::Organizer => ROLE_ORGANIZER,
            UserRole::Admin => ROLE_ADMIN,
        }
    }
}

/// Lenient conversion used when reading stored rows: unknown values fall
/// back to the least privileged role.
impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        Self::parse(s).unwrap_or(UserRole::Attendee)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an account signs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
        }
    }
}

impl From<&str> for AuthProvider {
    fn from(s: &str) -> Self {
        match s {
            "google" => AuthProvider::Google,
            _ => AuthProvider::Local,
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 hash; `None` for accounts created through OAuth
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: UserRole,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub is_verified: bool,
    pub is_profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Check if user is soft deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Local account that can sign in with a password
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// New user data handed to the repository
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub is_verified: bool,
}

impl NewUser {
    /// Unverified local signup
    pub fn local(email: String, password_hash: String) -> Self {
        Self {
            email,
            password_hash: Some(password_hash),
            name: None,
            provider: AuthProvider::Local,
            provider_id: None,
            is_verified: false,
        }
    }

    /// Account created from a verified OAuth identity
    pub fn oauth(profile: &OAuthProfile) -> Self {
        Self {
            email: profile.email.clone(),
            password_hash: None,
            name: profile.name.clone(),
            provider: profile.provider,
            provider_id: Some(profile.provider_id.clone()),
            is_verified: true,
        }
    }
}

/// Partial update applied by the repository; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub provider_id: Option<String>,
    pub is_verified: Option<bool>,
    pub is_profile_complete: Option<bool>,
}

/// Identity returned by an OAuth provider after the code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider: AuthProvider,
    pub provider_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// The authenticated caller, as proven by a full session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    #[schema(example = "attendee")]
    pub role: String,
    #[schema(example = "local")]
    pub provider: String,
    pub is_verified: bool,
    pub is_profile_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role.to_string(),
            provider: user.provider.to_string(),
            is_verified: user.is_verified,
            is_profile_complete: user.is_profile_complete,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(UserRole::parse("organizer"), Some(UserRole::Organizer));
        assert_eq!(UserRole::parse("superuser"), None);
        assert_eq!(UserRole::from("superuser"), UserRole::Attendee);
    }

    #[test]
    fn test_role_permissions() {
        assert!(!UserRole::Attendee.can_publish_events());
        assert!(UserRole::Organizer.can_publish_events());
        assert!(UserRole::Admin.can_publish_events());
        assert!(!UserRole::Admin.is_self_assignable());
    }

    #[test]
    fn test_oauth_new_user_is_verified() {
        let profile = OAuthProfile {
            provider: AuthProvider::Google,
            provider_id: "1234".to_string(),
            email: "g@example.com".to_string(),
            name: Some("G User".to_string()),
        };
        let new_user = NewUser::oauth(&profile);
        assert!(new_user.is_verified);
        assert!(new_user.password_hash.is_none());
        assert_eq!(new_user.provider, AuthProvider::Google);
    }
}
