//! # Authentication Module
//!
//! Token issuance and verification, password checking, the login and signup
//! flows, and the middleware that gates protected routes.

pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use jwt::JwtService;
pub use middleware::{AUTH_COOKIE, AuthMiddleware};
pub use models::CurrentUser;
pub use password::{Argon2Verifier, PasswordVerifier};
pub use service::AuthService;
