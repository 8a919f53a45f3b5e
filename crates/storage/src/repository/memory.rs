use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{FleetRecord, NewVote, RatingDocument, Ratings, Vote};
use crate::traits::{CommitOutcome, FleetMirror, PurgeReport, RatingStore, SaveOutcome};

#[derive(Default)]
struct Collection {
    snapshots: Vec<RatingDocument>,
    votes: Vec<Vote>,
}

/// In-process arena collection with the same revision semantics as the
/// Postgres store. Used for local runs and tests.
#[derive(Default)]
pub struct MemoryRatingStore {
    collection: RwLock<Collection>,
}

impl MemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a snapshot verbatim, without any revision check. Loads exports
    /// from older deployments, which may hold several snapshots per study.
    pub async fn import_rating_document(&self, document: RatingDocument) {
        self.collection.write().await.snapshots.push(document);
    }

    pub async fn document_count(&self, study: &str) -> usize {
        let collection = self.collection.read().await;
        collection.snapshots.iter().filter(|d| d.study == study).count()
            + collection.votes.iter().filter(|v| v.study == study).count()
    }
}

impl Collection {
    fn save(&mut self, study: &str, ratings: &Ratings, expected: Option<i64>) -> SaveOutcome {
        let existing: Vec<usize> = self
            .snapshots
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.study == study)
            .map(|(idx, _)| idx)
            .collect();

        let current = existing
            .iter()
            .map(|&idx| self.snapshots[idx].revision)
            .max();

        if current != expected {
            return SaveOutcome::Conflict;
        }

        let revision = current.unwrap_or(0) + 1;
        let document = RatingDocument {
            study: study.to_string(),
            ratings: ratings.clone(),
            revision,
            timestamp: Utc::now(),
        };

        // A successful save collapses any duplicates into the one snapshot.
        for idx in existing.into_iter().rev() {
            self.snapshots.remove(idx);
        }
        self.snapshots.push(document);

        SaveOutcome::Saved { revision }
    }

    fn append(&mut self, vote: &NewVote) -> Vote {
        let record = Vote {
            vote_id: Uuid::new_v4(),
            study: vote.study.clone(),
            model1: vote.model1.clone(),
            model2: vote.model2.clone(),
            image1: vote.image1.clone(),
            image2: vote.image2.clone(),
            winner: vote.winner.clone(),
            prompt: vote.prompt.clone(),
            timestamp: Utc::now(),
        };
        self.votes.push(record.clone());
        record
    }
}

#[async_trait]
impl RatingStore for MemoryRatingStore {
    async fn load_rating_document(&self, study: &str) -> Result<Option<RatingDocument>> {
        let collection = self.collection.read().await;
        let documents = collection
            .snapshots
            .iter()
            .filter(|doc| doc.study == study)
            .cloned()
            .collect();

        Ok(RatingDocument::merge(documents))
    }

    async fn save_rating_document(
        &self,
        study: &str,
        ratings: &Ratings,
        expected_revision: Option<i64>,
    ) -> Result<SaveOutcome> {
        Ok(self
            .collection
            .write()
            .await
            .save(study, ratings, expected_revision))
    }

    async fn append_vote_record(&self, vote: &NewVote) -> Result<Vote> {
        Ok(self.collection.write().await.append(vote))
    }

    async fn commit_vote(
        &self,
        study: &str,
        ratings: &Ratings,
        expected_revision: Option<i64>,
        vote: &NewVote,
    ) -> Result<CommitOutcome> {
        let mut collection = self.collection.write().await;

        Ok(match collection.save(study, ratings, expected_revision) {
            SaveOutcome::Saved { revision } => CommitOutcome::Committed {
                revision,
                vote: collection.append(vote),
            },
            SaveOutcome::Conflict => CommitOutcome::Conflict,
        })
    }

    async fn query_latest_votes(&self, study: &str, limit: usize) -> Result<Vec<Vote>> {
        let collection = self.collection.read().await;

        // Votes are kept in insertion order, which is also timestamp order.
        Ok(collection
            .votes
            .iter()
            .rev()
            .filter(|vote| vote.study == study)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_votes_chronological(&self, study: &str) -> Result<Vec<Vote>> {
        let collection = self.collection.read().await;

        Ok(collection
            .votes
            .iter()
            .filter(|vote| vote.study == study)
            .cloned()
            .collect())
    }

    async fn purge_study(&self, study: &str, batch_size: usize) -> Result<PurgeReport> {
        let batch_size = batch_size.max(1);
        let mut collection = self.collection.write().await;
        let mut report = PurgeReport::default();

        loop {
            let mut remaining = batch_size;

            collection.snapshots.retain(|doc| {
                if remaining > 0 && doc.study == study {
                    remaining -= 1;
                    false
                } else {
                    true
                }
            });
            collection.votes.retain(|vote| {
                if remaining > 0 && vote.study == study {
                    remaining -= 1;
                    false
                } else {
                    true
                }
            });

            let deleted = batch_size - remaining;
            report.batches += 1;
            report.deleted += deleted as u64;

            if deleted < batch_size {
                report.complete = true;
                return Ok(report);
            }
        }
    }
}

/// In-process fleet mirror.
#[derive(Default)]
pub struct MemoryFleetMirror {
    rows: RwLock<Vec<FleetRecord>>,
}

impl MemoryFleetMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self) -> Vec<FleetRecord> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl FleetMirror for MemoryFleetMirror {
    async fn latest_records(
        &self,
        study: &str,
        models: &[String],
    ) -> Result<HashMap<String, FleetRecord>> {
        let rows = self.rows.read().await;
        let mut latest: HashMap<String, FleetRecord> = HashMap::new();

        for row in rows
            .iter()
            .filter(|row| row.study == study && models.contains(&row.model_name))
        {
            let newer = latest
                .get(&row.model_name)
                .is_none_or(|seen| row.time_of_rating > seen.time_of_rating);
            if newer {
                latest.insert(row.model_name.clone(), row.clone());
            }
        }

        Ok(latest)
    }

    async fn batch_write(&self, inserts: &[FleetRecord], updates: &[FleetRecord]) -> Result<()> {
        let mut rows = self.rows.write().await;

        for insert in inserts {
            match rows
                .iter_mut()
                .find(|row| row.study == insert.study && row.model_name == insert.model_name)
            {
                Some(row) => apply_if_newer(row, insert),
                None => rows.push(insert.clone()),
            }
        }
        for update in updates {
            if let Some(row) = rows.iter_mut().find(|row| row.id == update.id) {
                apply_if_newer(row, update);
            }
        }

        Ok(())
    }

    async fn records_for_model(&self, model_name: &str) -> Result<Vec<FleetRecord>> {
        let mut records: Vec<FleetRecord> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.model_name == model_name)
            .cloned()
            .collect();

        records.sort_by(|a, b| {
            b.time_of_rating
                .cmp(&a.time_of_rating)
                .then_with(|| a.study.cmp(&b.study))
        });
        Ok(records)
    }
}

fn apply_if_newer(row: &mut FleetRecord, write: &FleetRecord) {
    if row.time_of_rating < write.time_of_rating {
        row.rating = write.rating;
        row.time_of_rating = write.time_of_rating;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(entries: &[(&str, f64)]) -> Ratings {
        entries.iter().map(|(m, r)| (m.to_string(), *r)).collect()
    }

    #[tokio::test]
    async fn test_first_save_requires_no_revision() {
        let store = MemoryRatingStore::new();

        let outcome = store
            .save_rating_document("demo", &ratings(&[("a", 1016.0)]), Some(1))
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Conflict);

        let outcome = store
            .save_rating_document("demo", &ratings(&[("a", 1016.0)]), None)
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Saved { revision: 1 });
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts() {
        let store = MemoryRatingStore::new();
        store
            .save_rating_document("demo", &ratings(&[("a", 1016.0)]), None)
            .await
            .unwrap();
        store
            .save_rating_document("demo", &ratings(&[("a", 1030.0)]), Some(1))
            .await
            .unwrap();

        let outcome = store
            .save_rating_document("demo", &ratings(&[("a", 990.0)]), Some(1))
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Conflict);

        let doc = store.load_rating_document("demo").await.unwrap().unwrap();
        assert_eq!(doc.ratings.get("a"), Some(&1030.0));
        assert_eq!(doc.revision, 2);
    }

    #[tokio::test]
    async fn test_duplicate_snapshots_are_merged_then_collapsed() {
        let store = MemoryRatingStore::new();
        let now = Utc::now();
        store
            .import_rating_document(RatingDocument {
                study: "demo".to_string(),
                ratings: ratings(&[("a", 1010.0), ("b", 990.0)]),
                revision: 4,
                timestamp: now - chrono::Duration::seconds(10),
            })
            .await;
        store
            .import_rating_document(RatingDocument {
                study: "demo".to_string(),
                ratings: ratings(&[("a", 1020.0)]),
                revision: 1,
                timestamp: now,
            })
            .await;

        let merged = store.load_rating_document("demo").await.unwrap().unwrap();
        assert_eq!(merged.ratings, ratings(&[("a", 1020.0), ("b", 990.0)]));
        assert_eq!(merged.revision, 4);

        let outcome = store
            .save_rating_document("demo", &merged.ratings, Some(merged.revision))
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Saved { revision: 5 });
        assert_eq!(store.document_count("demo").await, 1);
    }

    #[tokio::test]
    async fn test_purge_runs_in_batches() {
        let store = MemoryRatingStore::new();
        for i in 0..5 {
            store
                .append_vote_record(&NewVote {
                    study: "demo".to_string(),
                    model1: "a".to_string(),
                    model2: "b".to_string(),
                    winner: "a".to_string(),
                    image1: format!("gs://arena/{i}-a.png"),
                    image2: format!("gs://arena/{i}-b.png"),
                    prompt: "prompt".to_string(),
                })
                .await
                .unwrap();
        }

        let report = store.purge_study("demo", 2).await.unwrap();
        assert_eq!(report.deleted, 5);
        assert_eq!(report.batches, 3);
        assert!(report.complete);
        assert_eq!(store.document_count("demo").await, 0);
    }

    #[tokio::test]
    async fn test_fleet_latest_record_per_model() {
        let mirror = MemoryFleetMirror::new();
        let now = Utc::now();
        let record = |model: &str, rating: i64, age: i64| FleetRecord {
            id: Uuid::new_v4(),
            model_name: model.to_string(),
            study: "demo".to_string(),
            rating: rust_decimal::Decimal::from(rating),
            time_of_rating: now - chrono::Duration::seconds(age),
        };

        mirror
            .batch_write(
                &[record("a", 1000, 30), record("a", 1016, 10), record("b", 984, 10)],
                &[],
            )
            .await
            .unwrap();

        let latest = mirror
            .latest_records("demo", &["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["a"].rating, rust_decimal::Decimal::from(1016));
        assert_eq!(mirror.rows().await.len(), 2);
    }

    #[tokio::test]
    async fn test_fleet_writes_never_go_back_in_time() {
        let mirror = MemoryFleetMirror::new();
        let now = Utc::now();
        let record = |rating: i64, age: i64| FleetRecord {
            id: Uuid::new_v4(),
            model_name: "a".to_string(),
            study: "demo".to_string(),
            rating: rust_decimal::Decimal::from(rating),
            time_of_rating: now - chrono::Duration::seconds(age),
        };

        let current = record(1030, 5);
        mirror.batch_write(&[current.clone()], &[]).await.unwrap();

        // A second first-insert for the same pair lands on the existing row.
        mirror.batch_write(&[record(1016, 20)], &[]).await.unwrap();
        // An update computed before the current row is dropped.
        let stale = FleetRecord {
            id: current.id,
            ..record(1011, 10)
        };
        mirror.batch_write(&[], &[stale]).await.unwrap();

        let rows = mirror.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rating, rust_decimal::Decimal::from(1030));

        let fresh = FleetRecord {
            id: current.id,
            ..record(1040, 0)
        };
        mirror.batch_write(&[], &[fresh]).await.unwrap();
        assert_eq!(mirror.rows().await[0].rating, rust_decimal::Decimal::from(1040));
    }
}
