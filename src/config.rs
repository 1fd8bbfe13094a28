//! Configuration module for environment variables and application settings
//!
//! Everything is read once at startup and handed to the components that need
//! it. Nothing here is global or mutable after `Config::from_env` returns.

use anyhow::{Context, Result, anyhow, bail};
use chrono::Duration;
use std::env;

const DEV_JWT_SECRET: &str = "dev-only-insecure-secret";

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener configuration
    pub server: ServerConfig,

    /// Token signing and lifetime
    pub auth: AuthConfig,

    /// Postgres URL; `None` selects the in-memory user store
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API with credentials
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret for issuing and verifying tokens
    pub jwt_secret: String,
    /// Value of the `iss` claim
    pub issuer: String,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Whether the credential cookie carries the `Secure` attribute
    pub cookie_secure: bool,
}

// The secret must never end up in logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("token_ttl", &self.token_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            issuer: env!("CARGO_PKG_NAME").to_string(),
            token_ttl,
            cookie_secure: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT").or_else(|_| env::var("SERVER_PORT")) {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("PORT/SERVER_PORT is not a valid port: {raw}"))?,
            Err(_) => 3000,
        };

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let mut auth = AuthConfig::new(load_jwt_secret()?, load_token_ttl()?);
        if let Ok(issuer) = env::var("JWT_ISSUER") {
            auth.issuer = issuer;
        }
        auth.cookie_secure = parse_bool("COOKIE_SECURE")?.unwrap_or(false);

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                cors_allowed_origins,
            },
            auth,
            database_url,
        })
    }
}

fn load_jwt_secret() -> Result<String> {
    match env::var("JWT_SECRET") {
        Ok(secret) if secret.is_empty() => bail!("JWT_SECRET must not be empty"),
        Ok(secret) => Ok(secret),
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("JWT_SECRET not set, using the development secret");
            Ok(DEV_JWT_SECRET.to_string())
        }
        Err(_) => Err(anyhow!("JWT_SECRET environment variable is required")),
    }
}

fn load_token_ttl() -> Result<Duration> {
    let seconds: i64 = match env::var("TOKEN_TTL_SECONDS") {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("TOKEN_TTL_SECONDS is not an integer: {raw}"))?,
        Err(_) => 300,
    };
    if seconds <= 0 {
        bail!("TOKEN_TTL_SECONDS must be positive, got {seconds}");
    }
    Ok(Duration::seconds(seconds))
}

fn parse_bool(name: &str) -> Result<Option<bool>> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(anyhow!("{name} must be a boolean, got {other}")),
        },
        Err(_) => Ok(None),
    }
}
