use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Where the database lives when nothing else says otherwise.
pub const DEFAULT_DATABASE_URL: &str = "attendance.db";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

impl Settings {
    /// Loads settings from `config.toml` (optional), then `TRACKER__*` environment variables, and
    /// finally `DATABASE_URL` from the environment or a `.env` file.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_sources("config", std::env::var("DATABASE_URL").ok())
    }

    /// Loads settings from the config file at `path`, letting `database_url` win over everything
    /// when given.
    pub fn from_sources(path: &str, database_url: Option<String>) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("TRACKER").separator("__"))
            .set_override_option("database.url", database_url)?
            .build()?
            .try_deserialize()
    }
}
