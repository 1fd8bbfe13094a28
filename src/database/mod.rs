//! # Database Module
//!
//! PostgreSQL integration using tokio-postgres and deadpool, plus the user
//! store abstraction the auth flows depend on.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod user_store;

pub use connection::DatabaseConnection;
pub use models::{NewUser, User};
pub use user_store::{MemoryUserStore, PgUserStore, StoreError, UserStore};
