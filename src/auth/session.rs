use axum::http::{HeaderMap, header};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, Env};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Claims
///
/// Payload of the signed session token. Only the user id is embedded; everything else about
/// the caller is looked up again on each request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's numeric id.
    pub sub: i64,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
}

/// Signs a session token for `user_id`, valid for the configured session lifetime.
pub fn issue_token(user_id: i64, config: &AppConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + config.session_ttl_secs,
    };
    let key = EncodingKey::from_secret(config.session_secret.as_bytes());
    encode(&Header::default(), &claims, &key)
}

/// Returns the user id carried by a validly signed, unexpired token.
///
/// Bad signatures, expired tokens and garbage all come back as `None`.
pub fn token_subject(token: &str, secret: &str) -> Option<i64> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => Some(data.claims.sub),
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "rejected session token");
            None
        }
    }
}

/// Finds the session token in the `session` cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

/// `Set-Cookie` value that starts a session.
pub fn session_cookie(token: &str, config: &AppConfig) -> String {
    let secure = if config.env == Env::Production { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{secure}",
        config.session_ttl_secs
    )
}

/// `Set-Cookie` value that ends the session.
pub fn clear_session_cookie(config: &AppConfig) -> String {
    let secure = if config.env == Env::Production { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{secure}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn issued_token_round_trips() {
        let config = AppConfig::default();
        let token = issue_token(42, &config).unwrap();
        assert_eq!(token_subject(&token, &config.session_secret), Some(42));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = AppConfig::default();
        let token = issue_token(1, &config).unwrap();
        assert_eq!(token_subject(&token, "some-other-secret"), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = AppConfig {
            session_ttl_secs: -60,
            ..AppConfig::default()
        };
        let token = issue_token(1, &config).unwrap();
        assert_eq!(token_subject(&token, &config.session_secret), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(token_subject("not.a.jwt", "secret"), None);
        assert_eq!(token_subject("", "secret"), None);
    }

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc.def"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn cookies_are_http_only_and_secure_in_production() {
        let mut config = AppConfig::default();
        assert!(!session_cookie("t", &config).contains("Secure"));
        config.env = Env::Production;
        let cookie = session_cookie("t", &config);
        assert!(cookie.starts_with("session=t;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(clear_session_cookie(&config).contains("Max-Age=0"));
    }
}
