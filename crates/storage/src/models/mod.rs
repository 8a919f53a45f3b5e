mod fleet;
mod rating;
mod vote;

pub use fleet::{Evaluation, FleetRecord};
pub use rating::{DEFAULT_RATING, DocumentType, RatingDocument, Ratings};
pub use vote::{NewVote, Vote, Winner};
