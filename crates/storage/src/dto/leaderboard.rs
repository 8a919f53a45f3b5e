use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based position; models with equal ratings still get distinct ranks.
    pub rank: usize,
    pub model: String,
    pub rating: f64,
}
