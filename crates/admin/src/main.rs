use std::sync::Arc;

use arena_storage::repository::{PgFleetMirror, PgRatingStore};
use arena_storage::{Arena, Database, EloSettings, FleetDatabase};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "arena-admin")]
#[command(about = "Arena rating maintenance tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "FLEET_DATABASE_URL")]
    fleet_database_url: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ranked ratings of a study
    Leaderboard { study: String },
    /// Print the latest votes of a study, newest first
    Votes {
        study: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete every rating snapshot and vote of a study
    Purge {
        study: String,

        #[arg(long)]
        yes: bool,
    },
    /// Rebuild a study's ratings from its vote log
    Recompute { study: String },
    /// Print the mirrored rating history of a model
    ModelHistory { model: String },
    /// Apply pending migrations to both databases
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("arena_admin={},arena_storage={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let fleet_url = cli.fleet_database_url.as_deref().filter(|u| !u.is_empty());
    if let Some(url) = fleet_url {
        arena_storage::ensure_separate_databases(&cli.database_url, url)?;
    }

    let db = Database::new(&cli.database_url).await?;
    let fleet = match fleet_url {
        Some(url) => Some(FleetDatabase::new(url).await?),
        None => None,
    };

    let mut arena = Arena::new(
        Arc::new(PgRatingStore::new(db.pool().clone())),
        EloSettings::from_env()?,
    )?;
    if let Some(fleet) = &fleet {
        arena = arena.with_mirror(Arc::new(PgFleetMirror::new(fleet.pool().clone())));
    }

    match cli.command {
        Commands::Leaderboard { study } => {
            let board = arena.get_leaderboard(&study).await?;
            if board.is_empty() {
                tracing::info!("No ratings recorded for study '{}'", study);
            }
            for entry in board {
                println!("{:>3}. {:<32} {:>8.2}", entry.rank, entry.model, entry.rating);
            }
        }
        Commands::Votes { study, limit } => {
            if !(1..=100).contains(&limit) {
                return Err("--limit must be between 1 and 100".into());
            }
            let votes = arena.get_recent_votes(&study, Some(limit)).await;
            println!("{}", serde_json::to_string_pretty(&votes)?);
        }
        Commands::Purge { study, yes } => {
            if !yes {
                return Err(format!(
                    "Refusing to purge study '{}' without --yes",
                    study
                )
                .into());
            }
            if !arena.purge_ratings(&study).await {
                return Err(format!("Purge of study '{}' did not complete", study).into());
            }
            tracing::info!("✓ Study '{}' purged", study);
        }
        Commands::Recompute { study } => {
            let report = arena.recompute_study(&study).await?;
            tracing::info!(
                "✓ Replayed {} votes ({} skipped) over {} models",
                report.votes_replayed,
                report.votes_skipped,
                report.models
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::ModelHistory { model } => {
            if !arena.has_mirror() {
                tracing::warn!("FLEET_DATABASE_URL not set, no history available");
            }
            let history = arena.model_history(&model).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Commands::Migrate => handle_migrate(&db, fleet.as_ref()).await?,
    }

    Ok(())
}

async fn handle_migrate(
    db: &Database,
    fleet: Option<&FleetDatabase>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Running arena migrations");
    db.run_migrations().await?;

    match fleet {
        Some(fleet) => {
            tracing::info!("Running fleet migrations");
            fleet.run_migrations().await?;
        }
        None => tracing::info!("No fleet database configured, skipping fleet migrations"),
    }

    tracing::info!("✓ Migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_purge_parses_confirmation_flag() {
        let cli = Cli::try_parse_from([
            "arena-admin",
            "--database-url",
            "postgres://localhost/arena",
            "purge",
            "demo",
            "--yes",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Purge { ref study, yes: true } if study == "demo"));
    }
}
