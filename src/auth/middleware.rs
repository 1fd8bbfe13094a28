//! Authentication Middleware
//!
//! Axum middleware that gates protected routes. Every request re-runs the full
//! check: extract the `Bearer` credential, verify the token, resolve the
//! subject in the user store. Nothing is cached between requests.

use anyhow::anyhow;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::errors::AuthError;
use crate::auth::models::CurrentUser;
use crate::errors::AppError;
use crate::server::AppState;

/// Cookie carrying `Bearer <token>` between login and later requests
pub const AUTH_COOKIE: &str = "authorization";

pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Reject the request unless it carries a valid credential for an existing user.
    pub async fn require_user(
        State(state): State<AppState>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, AppError> {
        let credential = extract_credential(req.headers()).ok_or_else(|| {
            tracing::warn!("[AuthMiddleware] {} {}: no credential", req.method(), req.uri());
            AuthError::TokenNotFound
        })?;

        let user = match state.auth.verify_credential(&credential).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(
                    "[AuthMiddleware] {} {}: rejected with {}",
                    req.method(),
                    req.uri(),
                    e.classify().code
                );
                return Err(e);
            }
        };
        tracing::debug!("[AuthMiddleware] authenticated user {}", user.id);

        req.extensions_mut().insert(user);
        Ok(next.run(req).await)
    }
}

/// Credential from the `Authorization` header, falling back to the `authorization` cookie.
/// Empty values count as absent.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(AUTH_COOKIE)
                .map(|cookie| cookie.value().to_string())
                .filter(|value| !value.is_empty())
        })
}

/// Handlers behind [`AuthMiddleware::require_user`] take the resolved identity as a parameter.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow!("route is not behind the authentication gate")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("authorization=Bearer%20from-cookie"));

        assert_eq!(extract_credential(&headers).as_deref(), Some("Bearer from-header"));
    }

    #[test]
    fn empty_header_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
        headers.insert(header::COOKIE, HeaderValue::from_static("authorization=Bearer%20abc"));

        assert_eq!(extract_credential(&headers).as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn cookie_value_is_percent_decoded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; authorization=Bearer%20abc.def.ghi"),
        );

        assert_eq!(extract_credential(&headers).as_deref(), Some("Bearer abc.def.ghi"));
    }

    #[test]
    fn missing_or_empty_carrier_is_absent() {
        assert!(extract_credential(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("authorization="));
        assert!(extract_credential(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=Bearer%20x"));
        assert!(extract_credential(&headers).is_none());
    }
}
