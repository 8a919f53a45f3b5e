use tracing::instrument;
use validator::Validate;

use super::{Arena, elo, mirror};
use crate::dto::vote::{MirrorStatus, VoteReceipt};
use crate::error::{Result, StorageError};
use crate::models::{Evaluation, NewVote, Ratings};
use crate::traits::CommitOutcome;

impl Arena {
    /// Records one human judgment and moves both competitors' ratings.
    ///
    /// The snapshot is read, updated and written back with a revision check;
    /// if another vote on the same study got there first the whole round is
    /// retried against the fresh snapshot, so no rating update is lost. The
    /// fleet mirror is updated afterwards and its outcome is reported in the
    /// receipt rather than failing the vote.
    #[instrument(skip(self, vote), fields(study = %vote.study))]
    pub async fn record_vote(&self, vote: NewVote) -> Result<VoteReceipt> {
        vote.validate()?;
        let winner = vote.winner_side().ok_or_else(|| {
            StorageError::InvalidVote("winner must be either model1 or model2".to_string())
        })?;

        let attempts = self.settings.max_save_attempts;

        for attempt in 1..=attempts {
            let document = self.store.load_rating_document(&vote.study).await?;
            let (mut ratings, revision) = match document {
                Some(doc) => (doc.ratings, Some(doc.revision)),
                None => (Ratings::new(), None),
            };

            let rating1 = self.rating_in(&ratings, &vote.model1);
            let rating2 = self.rating_in(&ratings, &vote.model2);
            let (new_rating1, new_rating2) =
                elo::compute_update(rating1, rating2, winner, self.settings.k_factor);

            ratings.insert(vote.model1.clone(), new_rating1);
            ratings.insert(vote.model2.clone(), new_rating2);

            match self
                .store
                .commit_vote(&vote.study, &ratings, revision, &vote)
                .await?
            {
                CommitOutcome::Committed { revision, vote: recorded } => {
                    tracing::info!(
                        model1 = %vote.model1,
                        model2 = %vote.model2,
                        winner = %vote.winner,
                        rating1 = new_rating1,
                        rating2 = new_rating2,
                        revision,
                        "vote recorded"
                    );

                    let mirror = self
                        .mirror_ratings(vec![
                            Evaluation::new(&vote.model1, &vote.study, new_rating1)
                                .rated_at(recorded.timestamp),
                            Evaluation::new(&vote.model2, &vote.study, new_rating2)
                                .rated_at(recorded.timestamp),
                        ])
                        .await;

                    return Ok(VoteReceipt {
                        vote_id: recorded.vote_id,
                        study: recorded.study,
                        model1: recorded.model1,
                        model1_rating: new_rating1,
                        model2: recorded.model2,
                        model2_rating: new_rating2,
                        winner: recorded.winner,
                        mirror,
                    });
                }
                CommitOutcome::Conflict => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        "rating document changed while voting, retrying"
                    );
                }
            }
        }

        Err(StorageError::Conflict {
            study: vote.study,
            attempts,
        })
    }

    pub(super) fn rating_in(&self, ratings: &Ratings, model: &str) -> f64 {
        ratings
            .get(model)
            .copied()
            .unwrap_or(self.settings.initial_rating)
    }

    async fn mirror_ratings(&self, evaluations: Vec<Evaluation>) -> MirrorStatus {
        let Some(fleet) = &self.mirror else {
            return MirrorStatus::Disabled;
        };

        match mirror::mirror_to_secondary_store(fleet.as_ref(), &evaluations, &self.settings).await
        {
            Ok(summary) => MirrorStatus::Mirrored {
                inserted: summary.inserted,
                updated: summary.updated,
            },
            Err(e) => {
                tracing::warn!(error = %e, "fleet mirror update failed, primary ratings are saved");
                MirrorStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
