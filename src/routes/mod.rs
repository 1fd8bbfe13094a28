// # Routes Module
//
// HTTP route handlers, grouped by functionality. Handlers return
// `AppResult` and leave response shaping for failures to `crate::errors`.
//
// ## Available Route Modules
// - `health`: liveness probe
// - `auth`: signup, login, logout
// - `tokens`: routes that require an authenticated user

/// Health check endpoint
pub mod health;

/// Signup, login and logout
pub mod auth;

/// Endpoints behind the authentication gate
pub mod tokens;
