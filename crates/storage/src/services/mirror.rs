use std::collections::BTreeMap;
use std::future::Future;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Evaluation, FleetRecord};
use crate::settings::EloSettings;
use crate::traits::FleetMirror;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Copies freshly computed ratings into the fleet-tracking mirror.
///
/// A (study, model) pair that was never mirrored gets a new row with a fresh
/// id; otherwise its latest row is updated in place. Writes carry the
/// evaluation's `time_of_rating` and the mirror skips any that are not newer
/// than the stored row, so a late write from an earlier vote cannot replace
/// a later rating. Inserts and updates go out as separate batches of at most
/// `mirror_batch_size` rows, each bounded by `mirror_timeout`.
pub async fn mirror_to_secondary_store(
    mirror: &dyn FleetMirror,
    evaluations: &[Evaluation],
    settings: &EloSettings,
) -> Result<MirrorSummary> {
    // Only the newest evaluation per (study, model) is written.
    let mut by_study: BTreeMap<&str, BTreeMap<&str, &Evaluation>> = BTreeMap::new();
    for evaluation in evaluations {
        if evaluation.model_name.is_empty() || evaluation.study.is_empty() {
            return Err(StorageError::ConstraintViolation(
                "mirrored ratings need a model name and a study".to_string(),
            ));
        }
        let latest = by_study
            .entry(evaluation.study.as_str())
            .or_default()
            .entry(evaluation.model_name.as_str())
            .or_insert(evaluation);
        if evaluation.time_of_rating > latest.time_of_rating {
            *latest = evaluation;
        }
    }

    let mut inserts = Vec::new();
    let mut updates = Vec::new();

    for (study, evaluations) in by_study {
        let models: Vec<String> = evaluations.keys().map(|model| model.to_string()).collect();
        let existing = with_timeout(settings, "fleet lookup", mirror.latest_records(study, &models))
            .await?;

        for evaluation in evaluations.into_values() {
            let rating = to_decimal(evaluation.rating)?;

            match existing.get(&evaluation.model_name) {
                Some(row) => updates.push(FleetRecord {
                    rating,
                    time_of_rating: evaluation.time_of_rating,
                    ..row.clone()
                }),
                None => inserts.push(FleetRecord {
                    id: Uuid::new_v4(),
                    model_name: evaluation.model_name.clone(),
                    study: evaluation.study.clone(),
                    rating,
                    time_of_rating: evaluation.time_of_rating,
                }),
            }
        }
    }

    let batch_size = settings.mirror_batch_size.max(1);

    for chunk in inserts.chunks(batch_size) {
        with_timeout(settings, "fleet insert batch", mirror.batch_write(chunk, &[])).await?;
    }
    for chunk in updates.chunks(batch_size) {
        with_timeout(settings, "fleet update batch", mirror.batch_write(&[], chunk)).await?;
    }

    Ok(MirrorSummary {
        inserted: inserts.len(),
        updated: updates.len(),
    })
}

async fn with_timeout<T>(
    settings: &EloSettings,
    what: &str,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(settings.mirror_timeout, operation)
        .await
        .map_err(|_| {
            StorageError::Timeout(format!(
                "{what} took longer than {:?}",
                settings.mirror_timeout
            ))
        })?
}

fn to_decimal(rating: f64) -> Result<Decimal> {
    Decimal::from_f64_retain(rating)
        .map(|decimal| decimal.round_dp(2))
        .ok_or_else(|| StorageError::ConstraintViolation(format!("rating {rating} is not numeric")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_rounds_to_cents() {
        assert_eq!(to_decimal(1016.736).unwrap(), Decimal::new(101674, 2));
        assert!(to_decimal(f64::NAN).is_err());
    }
}
