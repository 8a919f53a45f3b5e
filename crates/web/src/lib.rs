use axum::{Router, http::Method, routing::get};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod state;

pub use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::health::health,
        features::studies::handlers::record_vote,
        features::studies::handlers::get_leaderboard,
        features::studies::handlers::get_recent_votes,
        features::models::handlers::get_model_history,
        features::admin::handlers::purge_study,
        features::admin::handlers::recompute_study,
    ),
    components(
        schemas(
            arena_storage::dto::vote::RecordVoteRequest,
            arena_storage::dto::vote::VoteReceipt,
            arena_storage::dto::vote::MirrorStatus,
            arena_storage::dto::leaderboard::LeaderboardEntry,
            arena_storage::dto::maintenance::PurgeResponse,
            arena_storage::dto::maintenance::RecomputeReport,
            arena_storage::models::Vote,
            arena_storage::models::FleetRecord,
            features::health::HealthResponse,
        )
    ),
    tags(
        (name = "studies", description = "Voting and leaderboard endpoints"),
        (name = "models", description = "Per-model rating history"),
        (name = "admin", description = "Study maintenance, API key required"),
        (name = "health", description = "Liveness probe"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(features::health::health))
        .nest("/api/studies", features::studies::routes::routes())
        .nest("/api/models", features::models::routes::routes())
        .nest(
            "/api/admin",
            features::admin::routes::routes(state.api_keys.clone()),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}
