//! Session cookie handling.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::{Config, AUTH_COOKIE_NAME};
use crate::services::SessionToken;

/// Build the `token` cookie. Production cookies are `Secure` and cross-site
/// (`SameSite=None`); development cookies are `Lax`.
fn session_cookie(config: &Config, value: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, value))
        .http_only(true)
        .path("/")
        .secure(config.production)
        .same_site(if config.production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

/// Store the session token in the jar for the token's lifetime.
pub fn set_session(jar: CookieJar, config: &Config, session: &SessionToken) -> CookieJar {
    jar.add(session_cookie(
        config,
        session.token.clone(),
        session.expires_in,
    ))
}

/// Expire the session cookie.
pub fn clear_session(jar: CookieJar, config: &Config) -> CookieJar {
    jar.add(session_cookie(config, String::new(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionToken {
        SessionToken {
            token: "abc.def.ghi".to_string(),
            expires_in: 1800,
            temp: true,
        }
    }

    #[test]
    fn test_development_cookie_is_lax() {
        let config = Config::new("cookie-test-secret-long-enough-1234").unwrap();
        let jar = set_session(CookieJar::new(), &config, &session());
        let cookie = jar.get(AUTH_COOKIE_NAME).unwrap();

        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_ne!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(1800)));
    }

    #[test]
    fn test_production_cookie_is_secure_cross_site() {
        let mut config = Config::new("cookie-test-secret-long-enough-1234").unwrap();
        config.production = true;
        let jar = set_session(CookieJar::new(), &config, &session());
        let cookie = jar.get(AUTH_COOKIE_NAME).unwrap();

        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
    }

    #[test]
    fn test_clear_session_expires_cookie() {
        let config = Config::new("cookie-test-secret-long-enough-1234").unwrap();
        let jar = clear_session(CookieJar::new(), &config);
        let cookie = jar.get(AUTH_COOKIE_NAME).unwrap();

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
