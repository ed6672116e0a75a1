use crate::error::{EtlError, Result};
use crate::schema::validate_identifier;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::path::Path;

/// Default base URL of the NHL stats API.
pub const DEFAULT_API_BASE_URL: &str = "https://statsapi.web.nhl.com/api/v1";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Prefix for environment overrides, e.g. `NHL_ETL__DATABASE__HOST`.
pub const ENV_PREFIX: &str = "NHL_ETL";

/// Configuration for the NHL ETL pipelines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Upstream API configuration
    pub api: ApiConfig,

    /// Destination database configuration
    pub database: DatabaseConfig,

    /// Destination table names
    pub tables: TableNames,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,

    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub team: String,
    pub player: String,
    pub stats: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("nhl-etl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "nhl".to_string(),
            url: None,
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self { team: "team".to_string(), player: "player".to_string(), stats: "stats".to_string() }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl DatabaseConfig {
    /// Build sqlx connection options from this configuration
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url.parse::<PgConnectOptions>().map_err(EtlError::Connect);
        }

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name))
    }
}

impl EtlConfig {
    /// Load configuration from defaults, an optional TOML file and the environment
    ///
    /// Later sources win: file, then `NHL_ETL__*` variables, then `DATABASE_URL`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::from_sources(path, Some(Environment::with_prefix(ENV_PREFIX)))?;

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database.url = Some(db_url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file only
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = Self::from_sources(Some(path), None)?;
        config.validate()?;
        Ok(config)
    }

    fn from_sources(path: Option<&Path>, env: Option<Environment>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        if let Some(env) = env {
            builder = builder.add_source(env.separator("__").try_parsing(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Reject table names that cannot be safely interpolated into DDL
    pub fn validate(&self) -> Result<()> {
        for table in [&self.tables.team, &self.tables.player, &self.tables.stats] {
            validate_identifier(table)?;
        }
        Ok(())
    }
}
