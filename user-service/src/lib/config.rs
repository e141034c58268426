use std::env;

use auth::AuthSettings;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds (0 falls back to one hour)
    #[serde(default = "default_access_expire_secs")]
    pub access_expire_secs: i64,
    /// Refresh token lifetime in seconds (0 disables refresh tokens)
    #[serde(default = "default_refresh_expire_secs")]
    pub refresh_expire_secs: i64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PasswordConfig {
    /// Argon2 iteration count (0 selects the library default)
    #[serde(default)]
    pub cost: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_expire_secs() -> i64 {
    60 * 60
}

fn default_refresh_expire_secs() -> i64 {
    7 * 24 * 60 * 60
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }

    /// Token and hashing settings derived from the `jwt` and `password` sections.
    ///
    /// Fails when a TTL does not fit in a `chrono::Duration`.
    pub fn authenticator_settings(&self) -> Result<AuthSettings, ConfigError> {
        let access_ttl = ttl_seconds("jwt.access_expire_secs", self.jwt.access_expire_secs)?;
        let refresh_ttl = if self.jwt.refresh_expire_secs > 0 {
            Some(ttl_seconds(
                "jwt.refresh_expire_secs",
                self.jwt.refresh_expire_secs,
            )?)
        } else {
            None
        };

        Ok(AuthSettings {
            password_cost: self.password.cost,
            access_ttl,
            refresh_ttl,
        })
    }
}

fn ttl_seconds(key: &str, secs: i64) -> Result<Duration, ConfigError> {
    Duration::try_seconds(secs)
        .ok_or_else(|| ConfigError::Message(format!("{} is out of range: {}", key, secs)))
}

impl DatabaseConfig {
    /// Open the shared connection pool.
    pub async fn connect_pool(&self) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await?;

        tracing::info!(
            max_connections = self.max_connections,
            database = "postgresql",
            "Database connection pool created"
        );

        Ok(pool)
    }
}
