use axum::{
    Router, middleware,
    routing::{delete, post},
};

use super::handlers::{purge_study, recompute_study};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    Router::new()
        .route("/studies/:study", delete(purge_study))
        .route("/studies/:study/recompute", post(recompute_study))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth))
}
