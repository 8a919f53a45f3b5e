use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Rating of any model that has not been rated in a study yet.
pub const DEFAULT_RATING: f64 = 1000.0;

/// Model name to current rating.
pub type Ratings = BTreeMap<String, f64>;

/// Discriminator shared by every document in the arena collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    RatingSnapshot,
    Vote,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RatingSnapshot => "rating_snapshot",
            Self::Vote => "vote",
        }
    }
}

/// Per-study snapshot of every model's current rating.
///
/// `revision` increases by one on every successful save and is what
/// concurrent writers compare against before overwriting the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingDocument {
    pub study: String,
    pub ratings: Ratings,
    pub revision: i64,
    pub timestamp: DateTime<Utc>,
}

impl RatingDocument {
    /// Current rating of `model`, or `default` if it has never been rated.
    pub fn rating_of(&self, model: &str, default: f64) -> f64 {
        self.ratings.get(model).copied().unwrap_or(default)
    }

    /// Folds several snapshots for the same study into one.
    ///
    /// Snapshots are applied oldest first, so the most recently modified one
    /// wins for every model it mentions. The merged document reports the
    /// newest timestamp and the highest revision seen.
    pub fn merge(mut documents: Vec<RatingDocument>) -> Option<RatingDocument> {
        documents.sort_by_key(|doc| doc.timestamp);

        let mut documents = documents.into_iter();
        let mut merged = documents.next()?;

        for doc in documents {
            merged.ratings.extend(doc.ratings);
            merged.revision = merged.revision.max(doc.revision);
            merged.timestamp = doc.timestamp;
        }

        Some(merged)
    }
}
