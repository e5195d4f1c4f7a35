//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme,
};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{auth_handler, event_handler, user_handler};
use crate::config::AUTH_COOKIE_NAME;
use crate::domain::{AuthProvider, EventResponse, OrganizerSummary, UserResponse, UserRole};
use crate::types::{MessageResponse, PaginationMeta};

/// OpenAPI documentation for the EventEase API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "EventEase API",
        version = "0.1.0",
        description = "Event publishing and discovery with email, password and Google sign-in"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Authentication endpoints
        auth_handler::signup,
        auth_handler::verify_otp,
        auth_handler::login,
        auth_handler::complete_profile,
        auth_handler::google_start,
        auth_handler::google_callback,
        auth_handler::oauth_failure,
        auth_handler::logout,
        auth_handler::forgot_password,
        auth_handler::reset_password,
        // User endpoints
        user_handler::get_current_user,
        user_handler::update_user,
        user_handler::delete_user,
        // Event endpoints
        event_handler::list_events,
        event_handler::create_event,
        event_handler::get_event,
        event_handler::update_event,
        event_handler::delete_event,
    ),
    components(
        schemas(
            // Domain types
            UserRole,
            AuthProvider,
            UserResponse,
            EventResponse,
            OrganizerSummary,
            // Shared
            MessageResponse,
            PaginationMeta,
            // Auth types
            auth_handler::SignupRequest,
            auth_handler::SignupResponse,
            auth_handler::VerifyOtpRequest,
            auth_handler::VerifyOtpResponse,
            auth_handler::LoginRequest,
            auth_handler::SessionResponse,
            auth_handler::CompleteProfileRequest,
            auth_handler::ForgotPasswordRequest,
            auth_handler::ResetPasswordRequest,
            // User handler types
            user_handler::UpdateUserRequest,
            user_handler::DeleteUserRequest,
            // Event handler types
            event_handler::CreateEventRequest,
            event_handler::UpdateEventRequest,
            event_handler::EventListResponse,
            event_handler::EventEnvelope,
            event_handler::EventMessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, login, Google sign-in and password reset"),
        (name = "Users", description = "Account management"),
        (name = "Events", description = "Event publishing and discovery")
    )
)]
pub struct ApiDoc;

/// Session cookie and Bearer JWT security schemes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_COOKIE_NAME,
                    "Session cookie set by login, verify-otp and complete-profile",
                ))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Same JWT as the session cookie"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_event_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/events"));
        assert!(doc.paths.paths.contains_key("/events/{public_id}"));
        assert!(doc.paths.paths.contains_key("/auth/google/callback"));
    }
}
