use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FleetRecord, NewVote, RatingDocument, Ratings, Vote};

/// Result of a compare-and-swap save of a rating document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { revision: i64 },
    /// The stored document no longer matches the revision the caller read.
    Conflict,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed { revision: i64, vote: Vote },
    /// Nothing was written; the caller should reload and try again.
    Conflict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: u64,
    pub batches: u32,
    /// Whether every batch committed.
    pub complete: bool,
}

/// Document store holding rating snapshots and vote records, keyed by study.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// The rating snapshot of `study`, or `None` if no vote was ever cast in
    /// it. Several snapshots for one study are merged rather than rejected.
    async fn load_rating_document(&self, study: &str) -> Result<Option<RatingDocument>>;

    /// Overwrites the snapshot of `study` if its revision is still
    /// `expected_revision`, or creates it if `expected_revision` is `None`
    /// and no snapshot exists yet.
    async fn save_rating_document(
        &self,
        study: &str,
        ratings: &Ratings,
        expected_revision: Option<i64>,
    ) -> Result<SaveOutcome>;

    /// Always inserts a new vote record.
    async fn append_vote_record(&self, vote: &NewVote) -> Result<Vote>;

    /// Saves the snapshot and appends the vote as one unit of work.
    ///
    /// The default runs the two writes back to back, so a failure of the
    /// second leaves the ratings updated without the vote logged. Stores with
    /// transactions should override it.
    async fn commit_vote(
        &self,
        study: &str,
        ratings: &Ratings,
        expected_revision: Option<i64>,
        vote: &NewVote,
    ) -> Result<CommitOutcome> {
        match self
            .save_rating_document(study, ratings, expected_revision)
            .await?
        {
            SaveOutcome::Saved { revision } => {
                let vote = self.append_vote_record(vote).await?;
                Ok(CommitOutcome::Committed { revision, vote })
            }
            SaveOutcome::Conflict => Ok(CommitOutcome::Conflict),
        }
    }

    /// Most recent votes of `study`, newest first, at most `limit` of them.
    async fn query_latest_votes(&self, study: &str, limit: usize) -> Result<Vec<Vote>>;

    /// Every vote of `study`, oldest first.
    async fn list_votes_chronological(&self, study: &str) -> Result<Vec<Vote>>;

    /// Deletes every snapshot and vote of `study`, `batch_size` documents per
    /// commit. A failed batch stops the purge and is reported through
    /// [`PurgeReport::complete`].
    async fn purge_study(&self, study: &str, batch_size: usize) -> Result<PurgeReport>;
}

/// Relational mirror of the latest rating per (study, model).
#[async_trait]
pub trait FleetMirror: Send + Sync {
    /// Latest mirrored row for each of `models` in `study`. Models that were
    /// never mirrored are absent from the map.
    async fn latest_records(
        &self,
        study: &str,
        models: &[String],
    ) -> Result<HashMap<String, FleetRecord>>;

    /// Inserts `inserts` and updates the rows matching the ids of `updates`.
    ///
    /// There is at most one row per (study, model). A write whose
    /// `time_of_rating` is not newer than the stored row's is skipped, and an
    /// insert for a pair that already has a row becomes such an update.
    async fn batch_write(&self, inserts: &[FleetRecord], updates: &[FleetRecord]) -> Result<()>;

    /// Every row for `model_name` across studies, newest first.
    async fn records_for_model(&self, model_name: &str) -> Result<Vec<FleetRecord>>;
}
