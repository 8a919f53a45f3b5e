use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};
use tracing::instrument;

use crate::error::Result;
use crate::models::FleetRecord;
use crate::traits::FleetMirror;

/// Fleet-tracking mirror in its own Postgres database (`model_ratings`).
#[derive(Clone)]
pub struct PgFleetMirror {
    pool: PgPool,
}

impl PgFleetMirror {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FleetMirror for PgFleetMirror {
    #[instrument(skip(self))]
    async fn latest_records(
        &self,
        study: &str,
        models: &[String],
    ) -> Result<HashMap<String, FleetRecord>> {
        let records: Vec<FleetRecord> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (model_name)
                id, model_name, study, rating, time_of_rating
            FROM model_ratings
            WHERE study = $1 AND model_name = ANY($2)
            ORDER BY model_name, time_of_rating DESC
            "#,
        )
        .bind(study)
        .bind(models)
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|record| (record.model_name.clone(), record))
            .collect())
    }

    #[instrument(skip_all, fields(inserts = inserts.len(), updates = updates.len()))]
    async fn batch_write(&self, inserts: &[FleetRecord], updates: &[FleetRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !inserts.is_empty() {
            let mut query = QueryBuilder::new(
                "INSERT INTO model_ratings (id, model_name, study, rating, time_of_rating) ",
            );
            query.push_values(inserts, |mut row, record| {
                row.push_bind(record.id)
                    .push_bind(&record.model_name)
                    .push_bind(&record.study)
                    .push_bind(record.rating)
                    .push_bind(record.time_of_rating);
            });
            query.push(
                " ON CONFLICT (study, model_name) DO UPDATE \
                 SET rating = EXCLUDED.rating, time_of_rating = EXCLUDED.time_of_rating \
                 WHERE model_ratings.time_of_rating < EXCLUDED.time_of_rating",
            );
            query.build().execute(&mut *tx).await?;
        }

        if !updates.is_empty() {
            let mut query = QueryBuilder::new(
                "UPDATE model_ratings AS m SET rating = v.rating, time_of_rating = v.time_of_rating FROM (",
            );
            query.push_values(updates, |mut row, record| {
                row.push_bind(record.id)
                    .push_bind(record.rating)
                    .push_bind(record.time_of_rating);
            });
            query.push(
                ") AS v(id, rating, time_of_rating) \
                 WHERE m.id = v.id AND m.time_of_rating < v.time_of_rating",
            );
            query.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn records_for_model(&self, model_name: &str) -> Result<Vec<FleetRecord>> {
        let records = sqlx::query_as::<_, FleetRecord>(
            r#"
            SELECT id, model_name, study, rating, time_of_rating
            FROM model_ratings
            WHERE model_name = $1
            ORDER BY time_of_rating DESC, study
            "#,
        )
        .bind(model_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
