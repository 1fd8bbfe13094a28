//! # Error Classifier
//!
//! Every failure a handler or the authentication gate can produce ends up as an
//! [`AppError`]. [`AppError::classify`] turns it into a fixed
//! `(status, code, message)` triple and [`IntoResponse`] renders that triple as
//! `{"error": {"code": ..., "message": ...}}`. No other module shapes error
//! responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::any::Any;

use crate::auth::errors::AuthError;
use crate::database::StoreError;

/// Application-level error returned by handlers and middleware
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("username is already registered")]
    UserAlreadyExists,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// The observable contract of an error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl Classified {
    const fn new(status: StatusCode, code: &'static str, message: &'static str) -> Self {
        Self {
            status,
            code,
            message,
        }
    }
}

impl AppError {
    /// Map the error to its stable response triple.
    pub fn classify(&self) -> Classified {
        match self {
            AppError::Auth(auth) => match auth {
                AuthError::TokenNotFound => Classified::new(
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_NOT_FOUND",
                    "Token not found.",
                ),
                AuthError::TokenExpired => Classified::new(
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_EXPIRED",
                    "Token has expired.",
                ),
                AuthError::TokenMalformed => Classified::new(
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "Token is invalid or has been tampered with.",
                ),
                AuthError::InvalidTokenScheme => Classified::new(
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN_SCHEME",
                    "Token type must be Bearer.",
                ),
                AuthError::UserNotFound => Classified::new(
                    StatusCode::UNAUTHORIZED,
                    "USER_NOT_FOUND",
                    "The user for this token no longer exists.",
                ),
                AuthError::InvalidCredentials => Classified::new(
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Username or password is incorrect.",
                ),
            },
            AppError::UserAlreadyExists => Classified::new(
                StatusCode::CONFLICT,
                "USER_ALREADY_EXISTS",
                "User is already registered.",
            ),
            AppError::InvalidRequest(_) => Classified::new(
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                "Request body is invalid.",
            ),
            AppError::Internal(_) => Classified::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Internal server error.",
            ),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken => AppError::UserAlreadyExists,
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Wire format of an error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let classified = self.classify();
        match &self {
            AppError::Internal(err) => tracing::error!("Unhandled error: {:#}", err),
            AppError::InvalidRequest(detail) => tracing::debug!("Rejected request: {}", detail),
            _ => tracing::debug!("Request failed with {}", classified.code),
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: classified.code.to_string(),
                message: classified.message.to_string(),
            },
        };
        (classified.status, Json(body)).into_response()
    }
}

/// Response for a handler that panicked, used with `CatchPanicLayer`
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

pub type AppResult<T> = Result<T, AppError>;
