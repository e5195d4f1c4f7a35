//! Authentication service - signup, OTP verification, login, profile
//! completion, Google sign-in and password reset.
//!
//! Tokens come in two kinds. A *full* token carries the user's role and is
//! accepted everywhere. A *temp* token is handed out while the profile is
//! incomplete and only unlocks profile completion.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{
    Config, MAX_OTP_ATTEMPTS, OAUTH_STATE_TTL_SECONDS, OTP_TTL_SECONDS, SECONDS_PER_HOUR,
    TEMP_TOKEN_MINUTES,
};
use crate::domain::{
    AuthProvider, NewUser, OneTimeCode, Password, User, UserChanges, UserRole,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::cache::{oauth_state_key, otp_attempts_key, reset_otp_key, signup_otp_key};
use crate::infra::{CacheStore, Mailer, OAuthProvider, OutgoingEmail, UnitOfWork};

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    /// Absent on temp tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub temp: bool,
    /// Set on temp tokens minted after an OAuth sign-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AuthProvider>,
    pub exp: i64,
    pub iat: i64,
}

/// A signed token and its lifetime in seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub expires_in: i64,
    pub temp: bool,
}

/// Full session for a user whose profile is complete
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub session: SessionToken,
}

/// Temp session for a user who still has to complete the profile
#[derive(Debug, Clone)]
pub struct PendingProfile {
    pub user_id: Uuid,
    pub session: SessionToken,
}

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedSession),
    ProfileRequired(PendingProfile),
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register (or re-register an unverified) local account and email a code.
    /// Returns the user id.
    async fn signup(&self, email: String, password: String) -> AppResult<Uuid>;

    /// Confirm the signup code and issue a temp token.
    async fn verify_otp(&self, email: String, otp: String) -> AppResult<PendingProfile>;

    async fn login(&self, email: String, password: String) -> AppResult<LoginOutcome>;

    /// Set name and role, then issue a full token.
    async fn complete_profile(
        &self,
        user_id: Uuid,
        name: String,
        role: UserRole,
    ) -> AppResult<AuthenticatedSession>;

    /// Consent page URL for Google sign-in, with a freshly stored state.
    async fn google_authorization_url(&self) -> AppResult<String>;

    /// Finish Google sign-in: check state, exchange code, find or create user.
    async fn google_callback(&self, code: String, state: String) -> AppResult<LoginOutcome>;

    /// Email a password reset code.
    async fn forgot_password(&self, email: String) -> AppResult<()>;

    async fn reset_password(
        &self,
        email: String,
        otp: String,
        new_password: String,
    ) -> AppResult<()>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Normalize an email for lookups and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sign a full or temp token for `user`.
fn generate_token(
    user: &User,
    temp: bool,
    provider: Option<AuthProvider>,
    config: &Config,
) -> AppResult<SessionToken> {
    let now = Utc::now();
    let lifetime = if temp {
        TEMP_TOKEN_MINUTES * 60
    } else {
        config.jwt_expiration_hours * SECONDS_PER_HOUR
    };

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: if temp { None } else { Some(user.role) },
        temp,
        provider,
        exp: (now + Duration::seconds(lifetime)).timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(SessionToken {
        token,
        expires_in: lifetime,
        temp,
    })
}

fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of AuthService using Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    cache: Arc<dyn CacheStore>,
    mailer: Arc<dyn Mailer>,
    oauth: Option<Arc<dyn OAuthProvider>>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(
        uow: Arc<U>,
        cache: Arc<dyn CacheStore>,
        mailer: Arc<dyn Mailer>,
        oauth: Option<Arc<dyn OAuthProvider>>,
        config: Config,
    ) -> Self {
        Self {
            uow,
            cache,
            mailer,
            oauth,
            config,
        }
    }

    fn oauth(&self) -> AppResult<&Arc<dyn OAuthProvider>> {
        self.oauth
            .as_ref()
            .ok_or_else(|| AppError::unavailable("Google sign-in is not configured"))
    }

    /// Send without failing the caller; delivery problems are only logged.
    async fn deliver(&self, email: OutgoingEmail) {
        let to = email.to.clone();
        if let Err(e) = self.mailer.send(email).await {
            tracing::error!(to = %to, error = %e, "Failed to send email");
        }
    }

    /// Store a fresh code under `key` and reset its wrong-guess counter.
    async fn issue_code(&self, key: &str) -> AppResult<OneTimeCode> {
        let code = OneTimeCode::generate();
        self.cache.put(key, code.as_str(), OTP_TTL_SECONDS).await?;
        self.cache.remove(&otp_attempts_key(key)).await?;
        Ok(code)
    }

    /// Consume the code stored under `key` if `otp` matches it.
    ///
    /// A wrong guess leaves the code in place but counts against it; after
    /// [`MAX_OTP_ATTEMPTS`] wrong guesses the code is discarded. A match is
    /// consumed atomically, so two requests racing with the same code cannot
    /// both succeed.
    async fn consume_code(&self, key: &str, otp: &str) -> AppResult<()> {
        let stored = self
            .cache
            .get(key)
            .await?
            .map(OneTimeCode::from_stored)
            .ok_or(AppError::InvalidOtp)?;

        if !stored.matches(otp) {
            let attempts = self
                .cache
                .increment(&otp_attempts_key(key), OTP_TTL_SECONDS)
                .await?;
            if attempts >= MAX_OTP_ATTEMPTS {
                self.cache.remove(key).await?;
                tracing::warn!(attempts, "One-time code discarded after repeated wrong guesses");
            }
            return Err(AppError::InvalidOtp);
        }

        match self.cache.take(key).await?.map(OneTimeCode::from_stored) {
            Some(taken) if taken.matches(otp) => Ok(()),
            _ => Err(AppError::InvalidOtp),
        }
    }

    fn outcome_for(&self, user: User, provider: Option<AuthProvider>) -> AppResult<LoginOutcome> {
        if user.is_profile_complete {
            let session = generate_token(&user, false, None, &self.config)?;
            Ok(LoginOutcome::Authenticated(AuthenticatedSession { user, session }))
        } else {
            let session = generate_token(&user, true, provider, &self.config)?;
            Ok(LoginOutcome::ProfileRequired(PendingProfile {
                user_id: user.id,
                session,
            }))
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn signup(&self, email: String, password: String) -> AppResult<Uuid> {
        let email = normalize_email(&email);
        let password_hash = Password::new(&password)?.into_string();
        let users = self.uow.users();

        // Soft-deleted accounts still hold their email
        let user = match users.find_by_email_with_deleted(&email).await? {
            Some(existing)
                if existing.is_deleted()
                    || existing.is_verified
                    || existing.provider != AuthProvider::Local =>
            {
                return Err(AppError::conflict("User"));
            }
            Some(existing) => {
                let changes = UserChanges {
                    password_hash: Some(password_hash),
                    ..Default::default()
                };
                users.update(existing.id, changes).await?
            }
            None => users.create(NewUser::local(email.clone(), password_hash)).await?,
        };

        let code = self.issue_code(&signup_otp_key(&email)).await?;
        self.deliver(OutgoingEmail::signup_code(&email, code.as_str()))
            .await;

        tracing::info!(user_id = %user.id, "Signup code issued");
        Ok(user.id)
    }

    async fn verify_otp(&self, email: String, otp: String) -> AppResult<PendingProfile> {
        let email = normalize_email(&email);
        let users = self.uow.users();
        let user = users.find_by_email(&email).await?.ok_or_not_found("User")?;

        self.consume_code(&signup_otp_key(&email), &otp).await?;

        let user = if user.is_verified {
            user
        } else {
            let changes = UserChanges {
                is_verified: Some(true),
                ..Default::default()
            };
            users.update(user.id, changes).await?
        };

        let session = generate_token(&user, true, None, &self.config)?;
        tracing::info!(user_id = %user.id, "Email verified");
        Ok(PendingProfile {
            user_id: user.id,
            session,
        })
    }

    async fn login(&self, email: String, password: String) -> AppResult<LoginOutcome> {
        let email = normalize_email(&email);
        let user = self.uow.users().find_by_email(&email).await?;

        // Runs a hash verification even for unknown emails
        let valid = Password::verify_stored(
            user.as_ref().and_then(|u| u.password_hash.as_deref()),
            &password,
        );

        let user = match user {
            Some(user) if valid => user,
            _ => return Err(AppError::InvalidCredentials),
        };

        if !user.is_verified {
            return Err(AppError::EmailNotVerified);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.outcome_for(user, None)
    }

    async fn complete_profile(
        &self,
        user_id: Uuid,
        name: String,
        role: UserRole,
    ) -> AppResult<AuthenticatedSession> {
        if !role.is_self_assignable() {
            return Err(AppError::bad_request("Role must be attendee or organizer"));
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Name is required"));
        }

        let users = self.uow.users();
        let current = users.find_by_id(user_id).await?.ok_or_not_found("User")?;
        if current.is_profile_complete {
            return Err(AppError::bad_request("Profile already completed"));
        }

        let changes = UserChanges {
            name: Some(name),
            role: Some(role),
            is_profile_complete: Some(true),
            ..Default::default()
        };
        let user = users.update(user_id, changes).await?;

        let session = generate_token(&user, false, None, &self.config)?;
        tracing::info!(user_id = %user.id, role = %user.role, "Profile completed");
        Ok(AuthenticatedSession { user, session })
    }

    async fn google_authorization_url(&self) -> AppResult<String> {
        let oauth = self.oauth()?;
        let state = Uuid::new_v4().simple().to_string();

        self.cache
            .put(&oauth_state_key(&state), "1", OAUTH_STATE_TTL_SECONDS)
            .await?;

        oauth.authorization_url(&state)
    }

    async fn google_callback(&self, code: String, state: String) -> AppResult<LoginOutcome> {
        let oauth = self.oauth()?;

        // Each state is good for exactly one callback
        if self.cache.take(&oauth_state_key(&state)).await?.is_none() {
            return Err(AppError::bad_request("Invalid OAuth state"));
        }

        let profile = oauth.exchange_code(&code).await?;
        let users = self.uow.users();

        let user = match users.find_by_email_with_deleted(&profile.email).await? {
            Some(existing) if existing.is_deleted() => return Err(AppError::Forbidden),
            Some(existing) => {
                let changes = UserChanges {
                    provider_id: existing
                        .provider_id
                        .is_none()
                        .then(|| profile.provider_id.clone()),
                    is_verified: (!existing.is_verified).then_some(true),
                    ..Default::default()
                };
                users.update(existing.id, changes).await?
            }
            None => users.create(NewUser::oauth(&profile)).await?,
        };

        tracing::info!(user_id = %user.id, provider = %profile.provider, "OAuth sign-in");
        self.outcome_for(user, Some(profile.provider))
    }

    async fn forgot_password(&self, email: String) -> AppResult<()> {
        let email = normalize_email(&email);
        let user = self
            .uow
            .users()
            .find_by_email(&email)
            .await?
            .ok_or_not_found("User")?;

        if !user.has_password() {
            return Err(AppError::bad_request(
                "This account signs in with Google and has no password",
            ));
        }

        let code = self.issue_code(&reset_otp_key(&email)).await?;
        self.deliver(OutgoingEmail::reset_code(&email, code.as_str()))
            .await;

        tracing::info!(user_id = %user.id, "Password reset code issued");
        Ok(())
    }

    async fn reset_password(
        &self,
        email: String,
        otp: String,
        new_password: String,
    ) -> AppResult<()> {
        let email = normalize_email(&email);
        let password_hash = Password::new(&new_password)?.into_string();

        let users = self.uow.users();
        let user = users.find_by_email(&email).await?.ok_or_not_found("User")?;

        self.consume_code(&reset_otp_key(&email), &otp).await?;

        let changes = UserChanges {
            password_hash: Some(password_hash),
            ..Default::default()
        };
        users.update(user.id, changes).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }
}
