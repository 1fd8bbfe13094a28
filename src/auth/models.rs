//! Authentication Models
//!
//! Data structures for authentication requests, responses, and user information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::User;

/// Identity resolved by the authentication gate for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
        }
    }
}

/// Signup request payload
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub nickname: String,
}

/// Signup response; never includes credentials
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub username: String,
    pub nickname: String,
}

/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token response after successful authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
