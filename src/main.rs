//! # Bearer Auth Server
//!
//! HTTP service that issues signed, time-limited bearer tokens at login and
//! checks them in front of protected routes.
//!
//! ## Architecture
//! - `config`: environment configuration, read once at startup
//! - `auth`: token codec, password verifier, login/signup flows, the gate
//! - `errors`: maps every failure to a stable status/code/message
//! - `database`: user store (Postgres or in-memory)
//! - `routes`: HTTP handlers
//! - `server`: router assembly and serving
//!
//! ## Running the Server
//! ```bash
//! JWT_SECRET=change-me cargo run
//! ```
//!
//! Without `DATABASE_URL` accounts live in memory.

mod auth;
mod config;
mod database;
mod errors;
mod routes;
mod server;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!("🏁 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!("🏗️  Build profile: {}", if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    });

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::start(config).await {
        tracing::error!("Server stopped: {:#}", e);
        std::process::exit(1);
    }
}
