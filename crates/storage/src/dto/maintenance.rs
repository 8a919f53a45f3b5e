use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PurgeResponse {
    pub study: String,
    pub purged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecomputeReport {
    pub study: String,
    pub votes_replayed: usize,
    /// Votes whose winner matched neither competitor.
    pub votes_skipped: usize,
    pub models: usize,
}
