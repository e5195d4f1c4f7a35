//! Google OAuth 2.0 authorization-code client.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::config::GoogleSettings;
use crate::domain::{AuthProvider, OAuthProfile};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPES: &str = "openid email profile";

/// External identity provider using the authorization-code flow
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Consent page URL carrying `state`
    fn authorization_url(&self, state: &str) -> AppResult<String>;

    /// Trade an authorization code for the user's profile
    async fn exchange_code(&self, code: &str) -> AppResult<OAuthProfile>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

pub struct GoogleOAuth {
    settings: GoogleSettings,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(settings: GoogleSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }
}

fn http_error(e: reqwest::Error) -> AppError {
    AppError::internal(format!("Google OAuth request failed: {}", e))
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn authorization_url(&self, state: &str) -> AppResult<String> {
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("response_type", "code"),
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_url.as_str()),
                ("scope", GOOGLE_SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| AppError::internal(format!("Invalid OAuth URL: {}", e)))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> AppResult<OAuthProfile> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", self.settings.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::internal(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(http_error)?;

        let info: GoogleUserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .json()
            .await
            .map_err(http_error)?;

        profile_from_userinfo(info)
    }
}

fn profile_from_userinfo(info: GoogleUserInfo) -> AppResult<OAuthProfile> {
    let email = match info.email {
        Some(email) if info.email_verified => email.to_lowercase(),
        Some(_) => return Err(AppError::bad_request("Google email is not verified")),
        None => return Err(AppError::bad_request("Google account has no email")),
    };

    Ok(OAuthProfile {
        provider: AuthProvider::Google,
        provider_id: info.sub,
        email,
        name: info.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> GoogleOAuth {
        GoogleOAuth::new(GoogleSettings {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "http://localhost:3000/auth/google/callback".to_string(),
        })
    }

    #[test]
    fn test_authorization_url_carries_state_and_scopes() {
        let url = google().authorization_url("state-abc").unwrap();
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("state=state-abc"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fcallback"));
    }

    #[test]
    fn test_profile_requires_verified_email() {
        let info = GoogleUserInfo {
            sub: "g-1".to_string(),
            email: Some("Jane@Example.com".to_string()),
            email_verified: false,
            name: None,
        };
        assert!(profile_from_userinfo(info).is_err());
    }

    #[test]
    fn test_profile_lowercases_email() {
        let info = GoogleUserInfo {
            sub: "g-1".to_string(),
            email: Some("Jane@Example.com".to_string()),
            email_verified: true,
            name: Some("Jane".to_string()),
        };
        let profile = profile_from_userinfo(info).unwrap();
        assert_eq!(profile.email, "jane@example.com");
        assert_eq!(profile.provider, AuthProvider::Google);
        assert_eq!(profile.provider_id, "g-1");
    }
}
