// Database Connection Management
//
// Handles PostgreSQL connection pooling using tokio-postgres and deadpool.
use anyhow::{Context, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::str::FromStr;
use std::time::Duration;

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
    pub timeouts: deadpool_postgres::Timeouts,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("dbname", &self.dbname)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

fn default_timeouts() -> deadpool_postgres::Timeouts {
    deadpool_postgres::Timeouts {
        wait: Some(Duration::from_secs(30)),
        create: Some(Duration::from_secs(30)),
        recycle: Some(Duration::from_secs(30)),
    }
}

impl DatabaseConfig {
    /// Create configuration from a `postgres://` connection string
    pub fn from_url(url: &str) -> Result<Self> {
        let config = tokio_postgres::Config::from_str(url).context("Failed to parse DATABASE_URL")?;

        Ok(Self {
            host: config
                .get_hosts()
                .first()
                .map(|h| match h {
                    tokio_postgres::config::Host::Tcp(s) => s.clone(),
                    tokio_postgres::config::Host::Unix(s) => s.to_string_lossy().to_string(),
                })
                .unwrap_or_else(|| "localhost".to_string()),
            port: config.get_ports().first().copied().unwrap_or(5432),
            user: config.get_user().map(str::to_string).unwrap_or_default(),
            password: config
                .get_password()
                .map(|p| String::from_utf8_lossy(p).to_string())
                .unwrap_or_default(),
            dbname: config.get_dbname().map(str::to_string).unwrap_or_default(),
            max_size: 16,
            timeouts: default_timeouts(),
        })
    }
}

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Create a new database connection with the provided configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let masked_host = format!("{}:{}/{}", config.host, config.port, config.dbname);
        tracing::info!("🔌 Connecting to database: {}", masked_host);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.dbname(&config.dbname);

        let tls_connector = TlsConnector::builder()
            .build()
            .context("Failed to build TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let connection = Self { pool };
        connection.health_check().await?;

        tracing::info!("✅ Database connection established successfully");
        Ok(connection)
    }

    /// Create connection from database URL
    pub async fn from_url(url: &str) -> Result<Self> {
        let config = DatabaseConfig::from_url(url)?;
        Self::new(config).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .context("Failed to get connection for health check")?;

        client
            .query("SELECT 1", &[])
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}
