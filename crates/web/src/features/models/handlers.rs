use arena_storage::models::FleetRecord;
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/models/{model}/ratings",
    params(
        ("model" = String, Path, description = "Model name")
    ),
    responses(
        (status = 200, description = "Mirrored ratings of the model across studies, newest first", body = Vec<FleetRecord>)
    ),
    tag = "models"
)]
pub async fn get_model_history(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<Response, WebError> {
    let history = state.arena.model_history(&model).await?;

    Ok(Json(history).into_response())
}
