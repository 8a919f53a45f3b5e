use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::NewVote;

/// Body of a vote submission; the study comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordVoteRequest {
    pub model1: String,
    pub model2: String,
    pub winner: String,
    pub image1: String,
    pub image2: String,
    pub prompt: String,
}

impl RecordVoteRequest {
    pub fn into_new_vote(self, study: impl Into<String>) -> NewVote {
        NewVote {
            study: study.into(),
            model1: self.model1,
            model2: self.model2,
            winner: self.winner,
            image1: self.image1,
            image2: self.image2,
            prompt: self.prompt,
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RecentVotesQuery {
    /// Number of votes to return, 1 to 100. Defaults to 10.
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<usize>,
}

/// What happened to the secondary fleet mirror while recording a vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MirrorStatus {
    /// No fleet mirror is configured.
    Disabled,
    Mirrored { inserted: usize, updated: usize },
    /// The primary write committed; only the mirror is behind.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VoteReceipt {
    pub vote_id: Uuid,
    pub study: String,
    pub model1: String,
    pub model1_rating: f64,
    pub model2: String,
    pub model2_rating: f64,
    pub winner: String,
    pub mirror: MirrorStatus,
}
