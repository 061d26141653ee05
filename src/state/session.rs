//! Session cookie parsing and issuance.
//!
//! The cookie value has the form `{player_id}:{session_secret}`. The server
//! never reconstructs it; it only verifies the secret against the snapshot.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::COOKIE, request::Parts},
};
use thiserror::Error;

use crate::error::AppError;

/// Name of the cookie carrying the session.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Failures while resolving the caller's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No session cookie on the request.
    #[error("session cookie missing")]
    CookieMissing,
    /// Session cookie present but not `{player_id}:{secret}`.
    #[error("invalid session cookie")]
    CookieInvalid,
}

/// Caller identity carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Player identifier as sent by the client.
    pub player_id: String,
    /// Secret issued at join time.
    pub secret: String,
}

/// Parse a raw cookie value into an identity.
pub fn parse_session_value(value: &str) -> Result<SessionIdentity, SessionError> {
    let (player_id, secret) = value.split_once(':').ok_or(SessionError::CookieInvalid)?;
    if player_id.is_empty() || secret.is_empty() || secret.contains(':') {
        return Err(SessionError::CookieInvalid);
    }
    Ok(SessionIdentity {
        player_id: player_id.to_owned(),
        secret: secret.to_owned(),
    })
}

/// Locate the session cookie among the request headers and parse it.
pub fn resolve_session(headers: &HeaderMap) -> Result<SessionIdentity, SessionError> {
    let value = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value)
        .ok_or(SessionError::CookieMissing)?;

    parse_session_value(value)
}

/// Render the `Set-Cookie` value issued to a player joining `game_id`.
pub fn session_cookie(player_id: i64, secret: &str, game_id: &str) -> String {
    format!("{SESSION_COOKIE_NAME}={player_id}:{secret}; Path=/{game_id}")
}

impl<S> FromRequestParts<S> for SessionIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve_session(&parts.headers).map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn parses_player_and_secret() {
        let identity = parse_session_value("12:deadbeef").unwrap();
        assert_eq!(identity.player_id, "12");
        assert_eq!(identity.secret, "deadbeef");
    }

    #[test]
    fn rejects_malformed_values() {
        for value in ["", "12", "12:", ":deadbeef", "12:dead:beef"] {
            assert_eq!(
                parse_session_value(value),
                Err(SessionError::CookieInvalid),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_cookie_is_distinct_from_invalid() {
        assert_eq!(
            resolve_session(&HeaderMap::new()),
            Err(SessionError::CookieMissing)
        );
        assert_eq!(
            resolve_session(&headers("theme=dark")),
            Err(SessionError::CookieMissing)
        );
        assert_eq!(
            resolve_session(&headers("session=garbage")),
            Err(SessionError::CookieInvalid)
        );
    }

    #[test]
    fn finds_session_among_other_cookies() {
        let identity = resolve_session(&headers("theme=dark; session=3:cafe; lang=en")).unwrap();
        assert_eq!(identity.player_id, "3");
        assert_eq!(identity.secret, "cafe");
    }

    #[test]
    fn issued_cookie_is_scoped_to_the_game() {
        let cookie = session_cookie(3, "cafe", "a1b2c3");
        assert_eq!(cookie, "session=3:cafe; Path=/a1b2c3");
        let value = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value)
            .unwrap();
        assert_eq!(parse_session_value(value).unwrap().player_id, "3");
    }
}
