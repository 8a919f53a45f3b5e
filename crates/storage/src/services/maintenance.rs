use tracing::instrument;

use super::{Arena, elo};
use crate::dto::maintenance::RecomputeReport;
use crate::error::{Result, StorageError};
use crate::models::Ratings;
use crate::traits::SaveOutcome;

impl Arena {
    /// Deletes every rating snapshot and vote of `study`. Returns whether
    /// all batches committed.
    #[instrument(skip(self))]
    pub async fn purge_ratings(&self, study: &str) -> bool {
        match self
            .store
            .purge_study(study, self.settings.purge_batch_size)
            .await
        {
            Ok(report) => {
                tracing::info!(
                    deleted = report.deleted,
                    batches = report.batches,
                    complete = report.complete,
                    "study purged"
                );
                report.complete
            }
            Err(e) => {
                tracing::error!(error = %e, "study purge failed");
                false
            }
        }
    }

    /// Rebuilds the rating snapshot of `study` by replaying its vote log
    /// oldest first, every model starting from the initial rating.
    #[instrument(skip(self))]
    pub async fn recompute_study(&self, study: &str) -> Result<RecomputeReport> {
        let attempts = self.settings.max_save_attempts;

        for attempt in 1..=attempts {
            let revision = self
                .store
                .load_rating_document(study)
                .await?
                .map(|doc| doc.revision);
            let votes = self.store.list_votes_chronological(study).await?;

            let mut ratings = Ratings::new();
            let mut replayed = 0;
            let mut skipped = 0;

            for vote in &votes {
                let Some(winner) = vote.winner_side() else {
                    tracing::warn!(vote_id = %vote.vote_id, winner = %vote.winner, "skipping vote with unknown winner");
                    skipped += 1;
                    continue;
                };

                let (rating1, rating2) = elo::compute_update(
                    self.rating_in(&ratings, &vote.model1),
                    self.rating_in(&ratings, &vote.model2),
                    winner,
                    self.settings.k_factor,
                );
                ratings.insert(vote.model1.clone(), rating1);
                ratings.insert(vote.model2.clone(), rating2);
                replayed += 1;
            }

            if revision.is_none() && ratings.is_empty() {
                return Ok(RecomputeReport {
                    study: study.to_string(),
                    votes_replayed: 0,
                    votes_skipped: skipped,
                    models: 0,
                });
            }

            match self
                .store
                .save_rating_document(study, &ratings, revision)
                .await?
            {
                SaveOutcome::Saved { revision } => {
                    tracing::info!(replayed, skipped, models = ratings.len(), revision, "study recomputed");
                    return Ok(RecomputeReport {
                        study: study.to_string(),
                        votes_replayed: replayed,
                        votes_skipped: skipped,
                        models: ratings.len(),
                    });
                }
                SaveOutcome::Conflict => {
                    tracing::warn!(attempt, attempts, "votes arrived during recompute, retrying");
                }
            }
        }

        Err(StorageError::Conflict {
            study: study.to_string(),
            attempts,
        })
    }
}
