use arena_storage::dto::{
    leaderboard::LeaderboardEntry,
    vote::{RecentVotesQuery, RecordVoteRequest, VoteReceipt},
};
use arena_storage::models::Vote;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/studies/{study}/votes",
    params(
        ("study" = String, Path, description = "Study the vote belongs to")
    ),
    request_body = RecordVoteRequest,
    responses(
        (status = 201, description = "Vote recorded and ratings updated", body = VoteReceipt),
        (status = 400, description = "Invalid vote"),
        (status = 409, description = "Too many concurrent votes on this study")
    ),
    tag = "studies"
)]
pub async fn record_vote(
    State(state): State<AppState>,
    Path(study): Path<String>,
    Json(payload): Json<RecordVoteRequest>,
) -> Result<Response, WebError> {
    let receipt = state
        .arena
        .record_vote(payload.into_new_vote(study))
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/studies/{study}/leaderboard",
    params(
        ("study" = String, Path, description = "Study to rank")
    ),
    responses(
        (status = 200, description = "Models ordered by rating, highest first", body = Vec<LeaderboardEntry>)
    ),
    tag = "studies"
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(study): Path<String>,
) -> Result<Response, WebError> {
    let board = state.arena.get_leaderboard(&study).await?;

    Ok(Json(board).into_response())
}

#[utoipa::path(
    get,
    path = "/api/studies/{study}/votes",
    params(
        ("study" = String, Path, description = "Study to read"),
        RecentVotesQuery
    ),
    responses(
        (status = 200, description = "Latest votes, newest first", body = Vec<Vote>),
        (status = 400, description = "Invalid limit")
    ),
    tag = "studies"
)]
pub async fn get_recent_votes(
    State(state): State<AppState>,
    Path(study): Path<String>,
    Query(params): Query<RecentVotesQuery>,
) -> Result<Response, WebError> {
    params.validate()?;

    let votes = state.arena.get_recent_votes(&study, params.limit).await;

    Ok(Json(votes).into_response())
}
