//! Resolution of free-text location fields against the gazetteer.
//!
//! normalize → find candidates → rank, then the fixer writes the winner back onto a record.

pub mod candidates;
pub mod fixer;
pub mod normalize;
pub mod overrides;
pub mod ranking;
pub mod service;
pub mod summary;

use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::gazetteer::{GazetteerStore, Location};
use crate::observability::metrics;

pub use candidates::find_candidates;
pub use fixer::{EventRecord, LocationIssue, NameStyle, RecordFixer, ResolutionErrors};
pub use normalize::{normalize, normalize_value, LocationQuery};
pub use overrides::{OverrideRule, DEFAULT_OVERRIDES};
pub use ranking::{RankedCandidate, Ranker};
pub use service::LocationService;
pub use summary::LocationSummary;

/// Finds the best gazetteer node for a city/region/country triple.
///
/// Holds only shared, read-only state, so clones can resolve on different threads.
#[derive(Clone)]
pub struct LocationResolver {
    store: Arc<dyn GazetteerStore>,
    ranker: Arc<Ranker>,
}

impl fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationResolver")
            .field("store", &self.store.stats())
            .field("ranker", &self.ranker)
            .finish()
    }
}

impl LocationResolver {
    pub fn new(store: Arc<dyn GazetteerStore>) -> Self {
        Self::with_ranker(store, Ranker::new())
    }

    pub fn with_ranker(store: Arc<dyn GazetteerStore>, ranker: Ranker) -> Self {
        Self {
            store,
            ranker: Arc::new(ranker),
        }
    }

    pub fn store(&self) -> &dyn GazetteerStore {
        self.store.as_ref()
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    /// Normalize the raw fields and return the best match, if any.
    pub fn resolve(
        &self,
        city: Option<&str>,
        region: Option<&str>,
        country: Option<&str>,
    ) -> Option<Location> {
        self.resolve_query(&LocationQuery::new(city, region, country))
    }

    #[instrument(skip(self), level = "debug")]
    pub fn resolve_query(&self, query: &LocationQuery) -> Option<Location> {
        let candidates = find_candidates(self.store(), query);
        metrics::resolution::candidates_found(candidates.len());

        let best = self.ranker.rank(self.store(), candidates, query);
        match &best {
            Some(location) => {
                debug!(best = %location, "Resolved location");
                metrics::resolution::resolved(location.level().as_str());
            }
            None => {
                debug!("No location matched");
                metrics::resolution::resolved("none");
            }
        }
        best
    }

    /// Every candidate with its score, best first
    pub fn explain(&self, query: &LocationQuery) -> Vec<RankedCandidate> {
        let candidates = find_candidates(self.store(), query);
        self.ranker.rank_all(self.store(), candidates, query)
    }
}
