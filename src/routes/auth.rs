//! Auth routes for signup, login and logout

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};

use crate::auth::AUTH_COOKIE;
use crate::auth::models::{LoginRequest, SignupRequest, SignupResponse, TokenResponse};
use crate::auth::service::BEARER_SCHEME;
use crate::errors::{AppError, AppResult};
use crate::server::AppState;

/// `POST /signup`: 201 with the public profile, 409 if the username is taken
pub async fn signup(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SignupRequest>, AppError>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let user = app_state.auth.signup(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            username: user.username,
            nickname: user.nickname,
        }),
    ))
}

/// `POST /login`: 200 with the token, which is also set as the `authorization` cookie
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let issued = app_state
        .auth
        .login(&payload.username, &payload.password)
        .await?;

    let mut cookie = Cookie::new(AUTH_COOKIE, format!("{BEARER_SCHEME} {}", issued.token));
    cookie.set_http_only(true);
    cookie.set_secure(app_state.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(issued.lifetime_seconds()));

    Ok((jar.add(cookie), Json(TokenResponse { token: issued.token })))
}

/// `POST /logout`: drops the cookie on the client. Issued tokens stay valid until they expire.
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let removal = Cookie::build((AUTH_COOKIE, "")).path("/");
    (jar.remove(removal), StatusCode::NO_CONTENT)
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}
