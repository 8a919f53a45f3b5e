use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{DocumentType, NewVote, RatingDocument, Ratings, Vote};
use crate::traits::{CommitOutcome, PurgeReport, RatingStore, SaveOutcome};

#[derive(FromRow)]
struct SnapshotRow {
    study: String,
    ratings: Json<Ratings>,
    revision: i64,
    updated_at: DateTime<Utc>,
}

impl From<SnapshotRow> for RatingDocument {
    fn from(row: SnapshotRow) -> Self {
        Self {
            study: row.study,
            ratings: row.ratings.0,
            revision: row.revision,
            timestamp: row.updated_at,
        }
    }
}

/// Postgres-backed arena collection (`arena_documents`).
#[derive(Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingStore for PgRatingStore {
    #[instrument(skip(self))]
    async fn load_rating_document(&self, study: &str) -> Result<Option<RatingDocument>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT study, ratings, revision, updated_at
            FROM arena_documents
            WHERE study = $1 AND doc_type = $2
            "#,
        )
        .bind(study)
        .bind(DocumentType::RatingSnapshot.as_str())
        .fetch_all(&self.pool)
        .await?;

        if rows.len() > 1 {
            tracing::warn!(
                study,
                documents = rows.len(),
                "found several rating snapshots for one study, merging them"
            );
        }

        Ok(RatingDocument::merge(
            rows.into_iter().map(RatingDocument::from).collect(),
        ))
    }

    #[instrument(skip(self, ratings))]
    async fn save_rating_document(
        &self,
        study: &str,
        ratings: &Ratings,
        expected_revision: Option<i64>,
    ) -> Result<SaveOutcome> {
        write_snapshot(&self.pool, study, ratings, expected_revision).await
    }

    #[instrument(skip(self, vote), fields(study = %vote.study))]
    async fn append_vote_record(&self, vote: &NewVote) -> Result<Vote> {
        insert_vote(&self.pool, vote).await
    }

    #[instrument(skip(self, ratings, vote))]
    async fn commit_vote(
        &self,
        study: &str,
        ratings: &Ratings,
        expected_revision: Option<i64>,
        vote: &NewVote,
    ) -> Result<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        match write_snapshot(&mut *tx, study, ratings, expected_revision).await? {
            SaveOutcome::Saved { revision } => {
                let vote = insert_vote(&mut *tx, vote).await?;
                tx.commit().await?;
                Ok(CommitOutcome::Committed { revision, vote })
            }
            SaveOutcome::Conflict => {
                tx.rollback().await?;
                Ok(CommitOutcome::Conflict)
            }
        }
    }

    #[instrument(skip(self))]
    async fn query_latest_votes(&self, study: &str, limit: usize) -> Result<Vec<Vote>> {
        let votes = sqlx::query_as::<_, Vote>(
            r#"
            SELECT document_id AS vote_id, study, model1, model2, image1, image2,
                   winner, prompt, created_at AS "timestamp"
            FROM arena_documents
            WHERE study = $1 AND doc_type = $2
            ORDER BY created_at DESC, document_id DESC
            LIMIT $3
            "#,
        )
        .bind(study)
        .bind(DocumentType::Vote.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(votes)
    }

    #[instrument(skip(self))]
    async fn list_votes_chronological(&self, study: &str) -> Result<Vec<Vote>> {
        let votes = sqlx::query_as::<_, Vote>(
            r#"
            SELECT document_id AS vote_id, study, model1, model2, image1, image2,
                   winner, prompt, created_at AS "timestamp"
            FROM arena_documents
            WHERE study = $1 AND doc_type = $2
            ORDER BY created_at ASC, document_id ASC
            "#,
        )
        .bind(study)
        .bind(DocumentType::Vote.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(votes)
    }

    #[instrument(skip(self))]
    async fn purge_study(&self, study: &str, batch_size: usize) -> Result<PurgeReport> {
        let batch_size = batch_size.max(1);
        let mut report = PurgeReport::default();

        loop {
            let result = sqlx::query(
                r#"
                DELETE FROM arena_documents
                WHERE document_id IN (
                    SELECT document_id
                    FROM arena_documents
                    WHERE study = $1 AND doc_type IN ($2, $3)
                    LIMIT $4
                )
                "#,
            )
            .bind(study)
            .bind(DocumentType::RatingSnapshot.as_str())
            .bind(DocumentType::Vote.as_str())
            .bind(batch_size as i64)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => {
                    report.batches += 1;
                    report.deleted += done.rows_affected();

                    if done.rows_affected() < batch_size as u64 {
                        report.complete = true;
                        return Ok(report);
                    }
                }
                Err(e) => {
                    tracing::error!(study, batch = report.batches + 1, error = %e, "purge batch failed");
                    return Ok(report);
                }
            }
        }
    }
}

async fn write_snapshot<'e, E>(
    executor: E,
    study: &str,
    ratings: &Ratings,
    expected_revision: Option<i64>,
) -> Result<SaveOutcome>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();

    let revision: Option<i64> = match expected_revision {
        Some(expected) => {
            sqlx::query_scalar(
                r#"
                WITH saved AS (
                    UPDATE arena_documents
                    SET ratings = $1, revision = revision + 1, updated_at = $2
                    WHERE document_id = (
                        SELECT document_id
                        FROM arena_documents
                        WHERE study = $3 AND doc_type = 'rating_snapshot' AND revision = $4
                        LIMIT 1
                    )
                      AND revision = $4
                    RETURNING document_id, revision
                ),
                collapsed AS (
                    DELETE FROM arena_documents
                    WHERE study = $3
                      AND doc_type = 'rating_snapshot'
                      AND EXISTS (SELECT 1 FROM saved)
                      AND document_id NOT IN (SELECT document_id FROM saved)
                )
                SELECT revision FROM saved
                "#,
            )
            .bind(Json(ratings))
            .bind(now)
            .bind(study)
            .bind(expected)
            .fetch_optional(executor)
            .await?
        }
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO arena_documents (document_id, study, doc_type, ratings, revision, created_at, updated_at)
                VALUES ($1, $2, 'rating_snapshot', $3, 1, $4, $4)
                ON CONFLICT (study) WHERE doc_type = 'rating_snapshot' DO NOTHING
                RETURNING revision
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(study)
            .bind(Json(ratings))
            .bind(now)
            .fetch_optional(executor)
            .await?
        }
    };

    Ok(match revision {
        Some(revision) => SaveOutcome::Saved { revision },
        None => SaveOutcome::Conflict,
    })
}

async fn insert_vote<'e, E>(executor: E, vote: &NewVote) -> Result<Vote>
where
    E: PgExecutor<'e>,
{
    let vote = sqlx::query_as::<_, Vote>(
        r#"
        INSERT INTO arena_documents
            (document_id, study, doc_type, model1, model2, image1, image2, winner, prompt, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING document_id AS vote_id, study, model1, model2, image1, image2,
                  winner, prompt, created_at AS "timestamp"
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&vote.study)
    .bind(DocumentType::Vote.as_str())
    .bind(&vote.model1)
    .bind(&vote.model2)
    .bind(&vote.image1)
    .bind(&vote.image2)
    .bind(&vote.winner)
    .bind(&vote.prompt)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
    .map_err(StorageError::from)
    .map_err(|e| {
        if e.is_check_violation() {
            StorageError::InvalidVote("vote record rejected by the store".to_string())
        } else {
            e
        }
    })?;

    Ok(vote)
}
