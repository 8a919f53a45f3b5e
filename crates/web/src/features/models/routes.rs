use axum::{Router, routing::get};

use super::handlers::get_model_history;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:model/ratings", get(get_model_history))
}
