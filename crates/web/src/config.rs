use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub fleet_database_url: Option<String>,
    pub api_keys: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            fleet_database_url: std::env::var("FLEET_DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            api_keys: std::env::var("API_KEYS").unwrap_or_default(),
        };

        if let Some(fleet_url) = &config.fleet_database_url {
            arena_storage::ensure_separate_databases(&config.database_url, fleet_url)
                .context("Invalid FLEET_DATABASE_URL")?;
        }

        Ok(config)
    }
}
