//! Routes that sit behind the authentication gate.

use axum::{Json, Router, http::StatusCode, routing::get};

use crate::auth::CurrentUser;
use crate::server::AppState;

/// `GET /tokens`: confirms the presented token and echoes the identity it resolved to
pub async fn tokens(user: CurrentUser) -> (StatusCode, Json<CurrentUser>) {
    (StatusCode::CREATED, Json(user))
}

/// `GET /me`
pub async fn me(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}

/// Protected routes; the caller layers the gate on top.
pub fn create_protected_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens", get(tokens))
        .route("/me", get(me))
}
