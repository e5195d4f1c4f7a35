//! Authentication handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{Json, Redirect},
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::cookies::{clear_session, set_session};
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{pending_auth_middleware, TokenHolder};
use crate::api::AppState;
use crate::config::Config;
use crate::domain::{UserResponse, UserRole};
use crate::errors::{AppError, AppResult};
use crate::services::{AuthenticatedSession, LoginOutcome, PendingProfile};
use crate::types::MessageResponse;

/// Local signup request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    /// Minimum 8 characters
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    #[schema(example = "Verification code sent to your email")]
    pub message: String,
    pub user_id: Uuid,
}

/// Signup verification request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    #[schema(example = "042517")]
    pub otp: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub message: String,
    pub temp_token: String,
    pub user_id: Uuid,
    pub requires_profile: bool,
}

/// User login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

/// Body returned whenever a token is issued.
///
/// `user` is present for full sessions, `requiresProfile` for temp ones.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_profile: Option<bool>,
    pub token: String,
}

impl SessionResponse {
    fn full(message: &str, session: AuthenticatedSession) -> Self {
        Self {
            message: message.to_string(),
            user: Some(UserResponse::from(session.user)),
            requires_profile: None,
            token: session.session.token,
        }
    }

    fn pending(message: &str, pending: PendingProfile) -> Self {
        Self {
            message: message.to_string(),
            user: None,
            requires_profile: Some(true),
            token: pending.session.token,
        }
    }
}

/// Profile completion request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    #[schema(example = "Jane Doe")]
    pub name: String,
    /// `attendee` or `organizer`
    #[schema(example = "organizer")]
    pub role: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Query Google appends to the callback URL
#[derive(Debug, Deserialize, IntoParams)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Create authentication routes
pub fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-otp", post(verify_otp))
        .route("/login", post(login))
        .route(
            "/complete-profile",
            post(complete_profile).route_layer(middleware::from_fn_with_state(
                state,
                pending_auth_middleware,
            )),
        )
        .route("/google", get(google_start))
        .route("/google/callback", get(google_callback))
        .route("/failure", get(oauth_failure))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Register a local account and email a verification code
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Verification code sent", body = SignupResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let user_id = state
        .auth_service
        .signup(payload.email, payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Verification code sent to your email".to_string(),
            user_id,
        }),
    ))
}

/// Confirm the emailed code; issues a temp token
#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    tag = "Authentication",
    request_body = VerifyOtpRequest,
    responses(
        (status = 201, description = "Email verified", body = VerifyOtpResponse),
        (status = 400, description = "Invalid or expired OTP"),
        (status = 404, description = "User not found")
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<VerifyOtpRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<VerifyOtpResponse>)> {
    let pending = state
        .auth_service
        .verify_otp(payload.email, payload.otp)
        .await?;

    let jar = set_session(jar, &state.config, &pending.session);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(VerifyOtpResponse {
            message: "Email verified successfully".to_string(),
            temp_token: pending.session.token,
            user_id: pending.user_id,
            requires_profile: true,
        }),
    ))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let outcome = state
        .auth_service
        .login(payload.email, payload.password)
        .await?;

    let (jar, body) = match outcome {
        LoginOutcome::Authenticated(session) => (
            set_session(jar, &state.config, &session.session),
            SessionResponse::full("Login successful", session),
        ),
        LoginOutcome::ProfileRequired(pending) => (
            set_session(jar, &state.config, &pending.session),
            SessionResponse::pending("Please complete your profile", pending),
        ),
    };

    Ok((jar, Json(body)))
}

/// Set name and role; accepts temp tokens
#[utoipa::path(
    post,
    path = "/auth/complete-profile",
    tag = "Authentication",
    request_body = CompleteProfileRequest,
    responses(
        (status = 200, description = "Profile completed", body = SessionResponse),
        (status = 400, description = "Invalid role or profile already completed"),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(holder): Extension<TokenHolder>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<CompleteProfileRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    if !holder.temp {
        return Err(AppError::bad_request("Profile already completed"));
    }

    let role = UserRole::parse(payload.role.trim())
        .filter(|role| !role.is_admin())
        .ok_or_else(|| AppError::bad_request("Role must be attendee or organizer"))?;

    let session = state
        .auth_service
        .complete_profile(holder.id, payload.name, role)
        .await?;

    let jar = set_session(jar, &state.config, &session.session);
    Ok((
        jar,
        Json(SessionResponse::full("Profile completed successfully", session)),
    ))
}

/// Start Google sign-in
#[utoipa::path(
    get,
    path = "/auth/google",
    tag = "Authentication",
    responses(
        (status = 303, description = "Redirect to Google consent page"),
        (status = 503, description = "Google sign-in not configured")
    )
)]
pub async fn google_start(State(state): State<AppState>) -> AppResult<Redirect> {
    let url = state.auth_service.google_authorization_url().await?;
    Ok(Redirect::to(&url))
}

fn failure_redirect(config: &Config) -> Redirect {
    Redirect::to(&config.client_path("/login?error=auth_failed"))
}

/// Google redirects here after consent
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    tag = "Authentication",
    params(GoogleCallbackQuery),
    responses(
        (status = 303, description = "Redirect to the frontend")
    )
)]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> (CookieJar, Redirect) {
    let (code, oauth_state) = match (query.code, query.state, query.error) {
        (Some(code), Some(oauth_state), None) => (code, oauth_state),
        (_, _, error) => {
            tracing::warn!(error = ?error, "Google callback without code or state");
            return (jar, failure_redirect(&state.config));
        }
    };

    match state
        .auth_service
        .google_callback(code, oauth_state)
        .await
    {
        Ok(LoginOutcome::ProfileRequired(pending)) => {
            let target = state.config.client_path(&format!(
                "/completeprofile?token={}&userId={}",
                pending.session.token, pending.user_id
            ));
            (
                set_session(jar, &state.config, &pending.session),
                Redirect::to(&target),
            )
        }
        Ok(LoginOutcome::Authenticated(session)) => {
            let target = state
                .config
                .client_path(&format!("/dashboard?token={}", session.session.token));
            (
                set_session(jar, &state.config, &session.session),
                Redirect::to(&target),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Google sign-in failed");
            (jar, failure_redirect(&state.config))
        }
    }
}

/// OAuth failure landing route
#[utoipa::path(
    get,
    path = "/auth/failure",
    tag = "Authentication",
    responses((status = 303, description = "Redirect to the login page with an error"))
)]
pub async fn oauth_failure(State(state): State<AppState>) -> Redirect {
    failure_redirect(&state.config)
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        clear_session(jar, &state.config),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

/// Email a password reset code
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "Authentication",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code sent", body = MessageResponse),
        (status = 400, description = "Account has no password"),
        (status = 404, description = "User not found")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.auth_service.forgot_password(payload.email).await?;
    Ok(Json(MessageResponse::new(
        "Password reset code sent to your email",
    )))
}

/// Set a new password using the emailed code
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "Authentication",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired OTP"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .auth_service
        .reset_password(payload.email, payload.otp, payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}
