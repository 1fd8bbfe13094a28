//! # Server Module
//!
//! HTTP server setup and route configuration.

use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue, middleware, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{Argon2Verifier, AuthMiddleware, AuthService, JwtService, PasswordVerifier};
use crate::config::{AuthConfig, Config};
use crate::database::{DatabaseConnection, MemoryUserStore, PgUserStore, UserStore, migrations};
use crate::errors::panic_response;
use crate::routes::{auth, health::ping, tokens};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        passwords: Arc<dyn PasswordVerifier>,
    ) -> Self {
        let jwt = Arc::new(JwtService::new(config));
        Self {
            auth: Arc::new(AuthService::new(users, passwords, jwt)),
            cookie_secure: config.cookie_secure,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: AppState, cors_allowed_origins: &[String]) -> Result<Router> {
    let protected_routes = tokens::create_protected_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), AuthMiddleware::require_user),
    );

    let mut app = Router::new()
        .route("/ping", get(ping))
        .merge(auth::create_auth_routes())
        .merge(protected_routes)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http());

    if !cors_allowed_origins.is_empty() {
        let origins = cors_allowed_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin: {origin}"))
            })
            .collect::<Result<Vec<_>>>()?;

        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::ORIGIN,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true),
        );
    }

    Ok(app.with_state(state))
}

async fn open_user_store(config: &Config) -> Result<Arc<dyn UserStore>> {
    match &config.database_url {
        Some(url) => {
            let db = DatabaseConnection::from_url(url).await?;
            migrations::run_migrations(db.pool()).await?;
            Ok(Arc::new(PgUserStore::new(db)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, accounts are kept in memory and lost on restart");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}

/// Starts the HTTP server and serves until Ctrl+C.
pub async fn start(config: Config) -> Result<()> {
    let users = open_user_store(&config).await?;
    let state = AppState::new(&config.auth, users, Arc::new(Argon2Verifier::new()));
    let app = build_router(state, &config.server.cors_allowed_origins)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);
    tracing::info!("⏱️  Token lifetime: {}s", config.auth.token_ttl.num_seconds());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated with an error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
