use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Which of the two competitors a judge picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    First,
    Second,
}

/// One recorded human judgment. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Vote {
    pub vote_id: Uuid,
    pub study: String,
    pub model1: String,
    pub model2: String,
    pub image1: String,
    pub image2: String,
    pub winner: String,
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
}

impl Vote {
    pub fn winner_side(&self) -> Option<Winner> {
        winner_side(&self.model1, &self.model2, &self.winner)
    }
}

/// A judgment as submitted, before it is stored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_pairing"))]
pub struct NewVote {
    #[validate(length(min = 1, message = "study must not be empty"))]
    pub study: String,

    #[validate(length(min = 1, message = "model1 must not be empty"))]
    pub model1: String,

    #[validate(length(min = 1, message = "model2 must not be empty"))]
    pub model2: String,

    #[validate(length(min = 1, message = "winner must not be empty"))]
    pub winner: String,

    pub image1: String,
    pub image2: String,
    pub prompt: String,
}

impl NewVote {
    pub fn winner_side(&self) -> Option<Winner> {
        winner_side(&self.model1, &self.model2, &self.winner)
    }
}

fn winner_side(model1: &str, model2: &str, winner: &str) -> Option<Winner> {
    if winner == model1 {
        Some(Winner::First)
    } else if winner == model2 {
        Some(Winner::Second)
    } else {
        None
    }
}

fn validate_pairing(vote: &NewVote) -> Result<(), ValidationError> {
    if vote.model1 == vote.model2 {
        let mut error = ValidationError::new("same_model");
        error.message = Some("model1 and model2 must be different models".into());
        return Err(error);
    }

    if vote.winner_side().is_none() {
        let mut error = ValidationError::new("unknown_winner");
        error.message = Some("winner must be either model1 or model2".into());
        return Err(error);
    }

    Ok(())
}
