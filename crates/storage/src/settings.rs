use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, StorageError};
use crate::models::DEFAULT_RATING;

/// Tunables for the rating engine and the stores behind it.
///
/// Built once at startup and handed to [`crate::Arena`]; nothing in the crate
/// reads the environment after that.
#[derive(Debug, Clone, PartialEq)]
pub struct EloSettings {
    /// Maximum rating change from a single comparison.
    pub k_factor: u32,
    /// Rating assumed for a model that has never been rated in a study.
    pub initial_rating: f64,
    /// How many load/compute/save rounds a vote gets before giving up on a
    /// rating document that keeps changing underneath it.
    pub max_save_attempts: u32,
    pub purge_batch_size: usize,
    pub mirror_batch_size: usize,
    pub mirror_timeout: Duration,
    pub recent_votes_limit: usize,
}

pub const MAX_PURGE_BATCH_SIZE: usize = 1000;

impl Default for EloSettings {
    fn default() -> Self {
        Self {
            k_factor: 32,
            initial_rating: DEFAULT_RATING,
            max_save_attempts: 5,
            purge_batch_size: MAX_PURGE_BATCH_SIZE,
            mirror_batch_size: 500,
            mirror_timeout: Duration::from_secs(30),
            recent_votes_limit: 10,
        }
    }
}

impl EloSettings {
    /// Defaults overridden by `ELO_K_FACTOR`, `ELO_INITIAL_RATING`,
    /// `ELO_MAX_SAVE_ATTEMPTS`, `MIRROR_BATCH_SIZE` and `MIRROR_TIMEOUT_SECS`
    /// when present. The result is validated.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let settings = Self {
            k_factor: env_or("ELO_K_FACTOR", defaults.k_factor)?,
            initial_rating: env_or("ELO_INITIAL_RATING", defaults.initial_rating)?,
            max_save_attempts: env_or("ELO_MAX_SAVE_ATTEMPTS", defaults.max_save_attempts)?,
            mirror_batch_size: env_or("MIRROR_BATCH_SIZE", defaults.mirror_batch_size)?,
            mirror_timeout: Duration::from_secs(env_or(
                "MIRROR_TIMEOUT_SECS",
                defaults.mirror_timeout.as_secs(),
            )?),
            ..defaults
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_factor == 0 {
            return Err(StorageError::Configuration(
                "k_factor must be greater than 0".to_string(),
            ));
        }
        if !self.initial_rating.is_finite() {
            return Err(StorageError::Configuration(
                "initial_rating must be a finite number".to_string(),
            ));
        }
        if self.max_save_attempts == 0 {
            return Err(StorageError::Configuration(
                "max_save_attempts must be greater than 0".to_string(),
            ));
        }
        if self.purge_batch_size == 0 || self.purge_batch_size > MAX_PURGE_BATCH_SIZE {
            return Err(StorageError::Configuration(format!(
                "purge_batch_size must be between 1 and {MAX_PURGE_BATCH_SIZE}"
            )));
        }
        if self.mirror_batch_size == 0 {
            return Err(StorageError::Configuration(
                "mirror_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.mirror_timeout.is_zero() {
            return Err(StorageError::Configuration(
                "mirror_timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StorageError::Configuration(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EloSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.k_factor, 32);
        assert_eq!(settings.initial_rating, 1000.0);
        assert_eq!(settings.purge_batch_size, 1000);
    }

    #[test]
    fn test_zero_k_factor_is_rejected() {
        let settings = EloSettings {
            k_factor: 0,
            ..EloSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(StorageError::Configuration(_))
        ));
    }

    #[test]
    fn test_purge_batch_size_is_capped() {
        let settings = EloSettings {
            purge_batch_size: 1001,
            ..EloSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_finite_initial_rating_is_rejected() {
        let settings = EloSettings {
            initial_rating: f64::NAN,
            ..EloSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
