use std::sync::Arc;

use crate::error::Result;
use crate::settings::EloSettings;
use crate::traits::{FleetMirror, RatingStore};

pub mod elo;
mod leaderboard;
mod maintenance;
mod mirror;
mod votes;

pub use leaderboard::rank_ratings;
pub use mirror::{MirrorSummary, mirror_to_secondary_store};

/// Entry point for everything the UI layer does with ratings: recording
/// votes, reading leaderboards and history, and study maintenance.
///
/// Built once at startup around the store clients and shared by reference.
#[derive(Clone)]
pub struct Arena {
    store: Arc<dyn RatingStore>,
    mirror: Option<Arc<dyn FleetMirror>>,
    settings: EloSettings,
}

impl Arena {
    pub fn new(store: Arc<dyn RatingStore>, settings: EloSettings) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            store,
            mirror: None,
            settings,
        })
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn FleetMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }
}
