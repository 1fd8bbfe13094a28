//! Authentication failure kinds shared by the login flow and the gate.

use crate::auth::jwt::TokenError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no credential was presented")]
    TokenNotFound,

    #[error("credential scheme is not Bearer")]
    InvalidTokenScheme,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is malformed or its signature does not match")]
    TokenMalformed,

    #[error("token subject does not exist")]
    UserNotFound,

    /// Unknown username and wrong password collapse into this one kind.
    #[error("invalid username or password")]
    InvalidCredentials,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed(_) => AuthError::TokenMalformed,
        }
    }
}
