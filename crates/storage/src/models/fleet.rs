use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Row of the fleet-tracking mirror: the rating a model held in a study at
/// `time_of_rating`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FleetRecord {
    pub id: Uuid,
    pub model_name: String,
    pub study: String,
    pub rating: Decimal,
    pub time_of_rating: DateTime<Utc>,
}

/// A freshly computed rating waiting to be mirrored.
///
/// `time_of_rating` orders evaluations of the same (study, model): the mirror
/// never replaces a row with an older one.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub model_name: String,
    pub study: String,
    pub rating: f64,
    pub time_of_rating: DateTime<Utc>,
}

impl Evaluation {
    pub fn new(model_name: impl Into<String>, study: impl Into<String>, rating: f64) -> Self {
        Self {
            model_name: model_name.into(),
            study: study.into(),
            rating,
            time_of_rating: Utc::now(),
        }
    }

    pub fn rated_at(mut self, time_of_rating: DateTime<Utc>) -> Self {
        self.time_of_rating = time_of_rating;
        self
    }
}
