pub mod documents;
pub mod fleet;
pub mod memory;

pub use documents::PgRatingStore;
pub use fleet::PgFleetMirror;
pub use memory::{MemoryFleetMirror, MemoryRatingStore};
