use std::collections::HashSet;
use tracing::debug;

use crate::gazetteer::{GazetteerStore, Location, LocationLevel};
use crate::location::LocationQuery;

/// Every gazetteer node that matches any input of `query` at any level.
///
/// Over-inclusive; the ranker picks the winner. Nodes appear once, in
/// input order (city, region, country) and, per input, cities before regions before
/// countries, each in store order.
pub fn find_candidates(store: &dyn GazetteerStore, query: &LocationQuery) -> Vec<Location> {
    let mut seen: HashSet<(LocationLevel, String)> = HashSet::new();
    let mut candidates = Vec::new();

    for value in query.values() {
        let found = store
            .cities_by_alias(value, None)
            .into_iter()
            .map(Location::City)
            .chain(store.regions_by_alias(value, None).into_iter().map(Location::Region))
            .chain(store.countries_by_alias(value).into_iter().map(Location::Country));

        for location in found {
            if seen.insert((location.level(), location.id().to_string())) {
                candidates.push(location);
            }
        }
    }

    debug!(count = candidates.len(), ?query, "Found location candidates");
    candidates
}
