use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{get_leaderboard, get_recent_votes, record_vote};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:study/votes", post(record_vote).get(get_recent_votes))
        .route("/:study/leaderboard", get(get_leaderboard))
}
