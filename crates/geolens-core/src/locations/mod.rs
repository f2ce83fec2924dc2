//! Candidate location catalogue.

mod seed;
mod store;

pub use seed::read_seed;
pub use store::LocationCandidateStore;

use crate::error::StoreError;
use crate::types::LocationCandidate;

/// Anything that can list the full candidate set.
///
/// [`LocationRanker`](crate::ranking::LocationRanker) reads through this so
/// it can be driven by an in-memory list in tests.
pub trait CandidateSource {
    /// Every candidate in a stable order.
    fn get_all_locations(&self) -> Result<Vec<LocationCandidate>, StoreError>;
}

impl CandidateSource for Vec<LocationCandidate> {
    fn get_all_locations(&self) -> Result<Vec<LocationCandidate>, StoreError> {
        Ok(self.clone())
    }
}
