//! Account handlers. Every route requires a full session token.

use axum::{
    extract::State,
    response::Json,
    routing::{get, put},
    Extension, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::cookies::clear_session;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{UserResponse, UserRole};
use crate::errors::{AppError, AppResult};
use crate::services::AccountUpdate;
use crate::types::{DataResponse, MessageResponse};

/// Update account request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    /// Account to update; must be the caller's unless the caller is an admin
    #[schema(example = "user@example.com")]
    pub email: Option<String>,
    /// Admin only
    #[schema(example = "organizer")]
    pub new_role: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: Option<String>,
}

/// Delete account request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteUserRequest {
    #[schema(example = "user@example.com")]
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/", put(update_user).delete(delete_user))
}

/// Get current authenticated user
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = state.user_service.get_user(current_user.id).await?;
    Ok(Json(DataResponse::new(UserResponse::from(user))))
}

/// Change a password or (admin) a role
#[utoipa::path(
    put,
    path = "/users",
    tag = "Users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, description = "Missing email or changes"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<MessageResponse>> {
    let new_role = payload
        .new_role
        .as_deref()
        .map(|role| UserRole::parse(role.trim()).ok_or_else(|| AppError::bad_request("Invalid role")))
        .transpose()?;

    let update = AccountUpdate {
        email: payload.email.unwrap_or_default(),
        new_role,
        new_password: payload.new_password,
    };
    state
        .user_service
        .update_account(&current_user.actor(), update)
        .await?;

    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// Delete the caller's account and its events
#[utoipa::path(
    delete,
    path = "/users",
    tag = "Users",
    request_body = DeleteUserRequest,
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Email and password are required"),
        (status = 401, description = "Wrong password"),
        (status = 403, description = "Not the caller's account")
    ),
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<DeleteUserRequest>,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    state
        .user_service
        .delete_account(
            &current_user.actor(),
            payload.email.unwrap_or_default(),
            payload.password.unwrap_or_default(),
        )
        .await?;

    Ok((
        clear_session(jar, &state.config),
        Json(MessageResponse::new("User deleted successfully")),
    ))
}
