use tracing::instrument;

use super::Arena;
use crate::dto::leaderboard::LeaderboardEntry;
use crate::error::Result;
use crate::models::{FleetRecord, Ratings, Vote};

impl Arena {
    /// Ratings of `study`, highest first. Empty if nobody voted yet.
    #[instrument(skip(self))]
    pub async fn get_leaderboard(&self, study: &str) -> Result<Vec<LeaderboardEntry>> {
        let document = self.store.load_rating_document(study).await?;

        Ok(document
            .map(|doc| rank_ratings(&doc.ratings))
            .unwrap_or_default())
    }

    /// Current rating of `model` in `study`, or the initial rating if it was
    /// never rated there. Never writes.
    #[instrument(skip(self))]
    pub async fn get_rating(&self, study: &str, model: &str) -> Result<f64> {
        let ratings = self
            .store
            .load_rating_document(study)
            .await?
            .map(|doc| doc.ratings)
            .unwrap_or_default();

        Ok(self.rating_in(&ratings, model))
    }

    /// Latest votes of `study`, newest first.
    ///
    /// A store failure is logged and reads as no votes, so history panels
    /// degrade to empty instead of failing the page.
    #[instrument(skip(self))]
    pub async fn get_recent_votes(&self, study: &str, limit: Option<usize>) -> Vec<Vote> {
        let limit = limit.unwrap_or(self.settings.recent_votes_limit);

        match self.store.query_latest_votes(study, limit).await {
            Ok(votes) => votes,
            Err(e) => {
                tracing::warn!(error = %e, "could not load recent votes");
                Vec::new()
            }
        }
    }

    /// Every mirrored rating of `model` across studies, newest first. Empty
    /// when no fleet mirror is configured.
    #[instrument(skip(self))]
    pub async fn model_history(&self, model: &str) -> Result<Vec<FleetRecord>> {
        match &self.mirror {
            Some(mirror) => mirror.records_for_model(model).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Sorts ratings descending. Ties keep the map's (alphabetical) order.
pub fn rank_ratings(ratings: &Ratings) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<(&String, f64)> = ratings.iter().map(|(m, r)| (m, *r)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, (model, rating))| LeaderboardEntry {
            rank: idx + 1,
            model: model.clone(),
            rating,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ratings_sorts_descending() {
        let ratings: Ratings = [("a", 984.0), ("b", 1016.74), ("c", 1000.0), ("d", 999.26)]
            .into_iter()
            .map(|(m, r)| (m.to_string(), r))
            .collect();

        let board = rank_ratings(&ratings);

        let models: Vec<&str> = board.iter().map(|e| e.model.as_str()).collect();
        assert_eq!(models, vec!["b", "c", "d", "a"]);
        assert!(board.windows(2).all(|w| w[0].rating >= w[1].rating));
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[3].rank, 4);
    }

    #[test]
    fn test_ties_keep_alphabetical_order() {
        let ratings: Ratings = [("zeta", 1000.0), ("alpha", 1000.0), ("mid", 1010.0)]
            .into_iter()
            .map(|(m, r)| (m.to_string(), r))
            .collect();

        let models: Vec<String> = rank_ratings(&ratings).into_iter().map(|e| e.model).collect();
        assert_eq!(models, vec!["mid", "alpha", "zeta"]);
    }

    #[test]
    fn test_empty_ratings_give_empty_board() {
        assert!(rank_ratings(&Ratings::new()).is_empty());
    }
}
