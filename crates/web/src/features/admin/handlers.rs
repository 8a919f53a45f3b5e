use arena_storage::dto::maintenance::{PurgeResponse, RecomputeReport};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    delete,
    path = "/api/admin/studies/{study}",
    params(
        ("study" = String, Path, description = "Study to purge")
    ),
    responses(
        (status = 200, description = "Every snapshot and vote of the study deleted", body = PurgeResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Purge stopped before completing", body = PurgeResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "admin"
)]
pub async fn purge_study(State(state): State<AppState>, Path(study): Path<String>) -> Response {
    let purged = state.arena.purge_ratings(&study).await;
    let status = if purged {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(PurgeResponse { study, purged })).into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/studies/{study}/recompute",
    params(
        ("study" = String, Path, description = "Study to rebuild from its vote log")
    ),
    responses(
        (status = 200, description = "Snapshot rebuilt", body = RecomputeReport),
        (status = 401, description = "Missing or invalid API key"),
        (status = 409, description = "Votes kept arriving during the rebuild")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "admin"
)]
pub async fn recompute_study(
    State(state): State<AppState>,
    Path(study): Path<String>,
) -> Result<Response, WebError> {
    let report = state.arena.recompute_study(&study).await?;

    Ok(Json(report).into_response())
}
