use std::sync::Arc;

use anyhow::Context;
use arena_storage::repository::{PgFleetMirror, PgRatingStore};
use arena_storage::{Arena, Database, EloSettings, FleetDatabase};
use arena_web::config::Config;
use arena_web::middleware::auth::ApiKeys;
use arena_web::{AppState, build_router};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Arena rating API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    let settings = EloSettings::from_env().context("Failed to load ELO settings")?;
    tracing::info!(
        k_factor = settings.k_factor,
        initial_rating = settings.initial_rating,
        "Configuration loaded successfully"
    );

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let mut arena = Arena::new(Arc::new(PgRatingStore::new(db.pool().clone())), settings)
        .context("Failed to build rating engine")?;

    match &config.fleet_database_url {
        Some(url) => {
            let fleet = FleetDatabase::new(url)
                .await
                .context("Failed to initialize fleet database")?;
            fleet
                .run_migrations()
                .await
                .context("Failed to run fleet migrations")?;
            arena = arena.with_mirror(Arc::new(PgFleetMirror::new(fleet.pool().clone())));
            tracing::info!("Fleet mirror enabled");
        }
        None => tracing::info!("FLEET_DATABASE_URL not set, fleet mirror disabled"),
    }

    let api_keys = ApiKeys::from_comma_separated(&config.api_keys);
    if api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty, admin endpoints will reject every request");
    }

    let app = build_router(AppState::new(arena, api_keys)).layer(TraceLayer::new_for_http());

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    axum::serve(listener, app).await?;

    Ok(())
}
