//! JWT authentication middleware.
//!
//! The token is read from the `token` cookie, falling back to an
//! `Authorization: Bearer` header.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::api::AppState;
use crate::config::{AUTH_COOKIE_NAME, BEARER_TOKEN_PREFIX};
use crate::domain::{Actor, UserRole};
use crate::errors::AppError;
use crate::services::Claims;

/// Authenticated user extracted from a full session token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Check if user has admin role.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Holder of any valid token, temp tokens included
#[derive(Clone, Debug)]
pub struct TokenHolder {
    pub id: Uuid,
    pub email: String,
    pub temp: bool,
}

/// Pull the raw token from the cookie or the bearer header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(AUTH_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn verify_request(state: &AppState, request: &Request) -> Result<Claims, AppError> {
    let token = extract_token(request.headers()).ok_or(AppError::Unauthorized)?;
    state.auth_service.verify_token(&token)
}

/// Require a full session token and inject [`CurrentUser`].
///
/// Temp tokens are refused with 403 `PROFILE_INCOMPLETE`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = verify_request(&state, &request)?;

    if claims.temp {
        return Err(AppError::ProfileIncomplete);
    }
    let role = claims.role.ok_or(AppError::Unauthorized)?;

    let current_user = CurrentUser {
        id: claims.sub,
        email: claims.email,
        role,
    };

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Accept any valid token (temp or full) and inject [`TokenHolder`].
pub async fn pending_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = verify_request(&state, &request)?;

    request.extensions_mut().insert(TokenHolder {
        id: claims.sub,
        email: claims.email,
        temp: claims.temp,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("token=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_cookie_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("token="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn test_current_user_actor() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            role: UserRole::Admin,
        };
        let actor = user.actor();
        assert!(user.is_admin());
        assert_eq!(actor.id, user.id);
        assert_eq!(actor.role, UserRole::Admin);
    }
}
