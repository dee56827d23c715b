//! Authentication middleware
//!
//! Accepts the access token either as `Authorization: Bearer <token>` or in
//! the `Authentication` cookie set at login. On success the caller is made
//! available to handlers as `Extension<AuthUser>`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::services::users;
use crate::AppState;

/// Name of the session cookie
pub const AUTH_COOKIE: &str = "Authentication";

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing access token".to_string()))?;

    let claims = state.tokens.verify(&token)?;

    let user = users::find_by_id(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| {
            debug!(user_id = %claims.sub, "Token names a user that no longer exists");
            ApiError::Unauthorized("Unknown user".to_string())
        })?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        username: user.username,
    });

    Ok(next.run(request).await)
}

/// Bearer header first, then the session cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a fresh token
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        AUTH_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn cleared_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", AUTH_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; Authentication=tok123; other=1"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer fromheader"));
        headers.insert(header::COOKIE, HeaderValue::from_static("Authentication=fromcookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("fromheader"));
    }

    #[test]
    fn test_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("Authentication="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_cookie_strings() {
        let cookie = session_cookie("t", 60, true);
        assert!(cookie.starts_with("Authentication=t;"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.ends_with("; Secure"));
        assert!(cleared_cookie().contains("Max-Age=0"));
    }
}
