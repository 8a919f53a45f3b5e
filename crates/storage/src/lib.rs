pub mod dto;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod settings;
pub mod traits;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use error::{Result, StorageError};
pub use services::Arena;
pub use settings::EloSettings;

/// Connection to the primary database holding the arena collection.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connection to the separate fleet-tracking database.
///
/// Must not be the primary database: both keep their migration history in
/// `_sqlx_migrations` and would reject each other's versions.
#[derive(Clone)]
pub struct FleetDatabase {
    pool: PgPool,
}

impl FleetDatabase {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./fleet_migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Rejects a fleet database URL that names the primary database.
pub fn ensure_separate_databases(database_url: &str, fleet_database_url: &str) -> Result<()> {
    let normalize = |url: &str| url.trim().trim_end_matches('/').to_string();

    if normalize(database_url) == normalize(fleet_database_url) {
        return Err(StorageError::Configuration(
            "FLEET_DATABASE_URL must name a different database than DATABASE_URL".to_string(),
        ));
    }
    Ok(())
}
