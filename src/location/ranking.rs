use std::cmp::Reverse;
use tracing::debug;

use crate::constants::{CITY_WEIGHT, COUNTRY_WEIGHT, REGION_WEIGHT};
use crate::gazetteer::{GazetteerStore, Location};
use crate::location::overrides::{OverrideRule, DEFAULT_OVERRIDES};
use crate::location::LocationQuery;

/// A candidate together with its score for one query
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub location: Location,
    pub score: u32,
}

/// Scores candidates against a query by walking each candidate's ancestry.
///
/// A city earns 3 when the city input is one of its labels, its region 2 for the region
/// input, its country 1 for the country input. Override rules add fixed bonuses.
/// Highest score wins, then highest population, then the earlier candidate.
#[derive(Debug, Clone)]
pub struct Ranker {
    overrides: Vec<OverrideRule>,
}

impl Default for Ranker {
    fn default() -> Self {
        Self {
            overrides: DEFAULT_OVERRIDES.clone(),
        }
    }
}

impl Ranker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranker using exactly `overrides`, without the defaults
    pub fn with_overrides(overrides: Vec<OverrideRule>) -> Self {
        Self { overrides }
    }

    pub fn add_override(&mut self, rule: OverrideRule) {
        self.overrides.push(rule);
    }

    pub fn overrides(&self) -> &[OverrideRule] {
        &self.overrides
    }

    pub fn score(
        &self,
        store: &dyn GazetteerStore,
        candidate: &Location,
        query: &LocationQuery,
    ) -> u32 {
        let mut score = 0;
        let mut check = Some(candidate.clone());

        while let Some(location) = check {
            let (input, weight) = match &location {
                Location::City(_) => (&query.city, CITY_WEIGHT),
                Location::Region(_) => (&query.region, REGION_WEIGHT),
                Location::Country(_) => (&query.country, COUNTRY_WEIGHT),
            };
            if let Some(input) = input {
                if store.also_known_as(&location).contains(input.as_str()) {
                    score += weight;
                }
            }
            check = location.parent();
        }

        score
            + self
                .overrides
                .iter()
                .map(|rule| rule.bonus_for(query, candidate))
                .sum::<u32>()
    }

    /// Score every candidate, best first. The sort is stable, so candidates that tie on
    /// score and population keep their input order.
    pub fn rank_all(
        &self,
        store: &dyn GazetteerStore,
        candidates: Vec<Location>,
        query: &LocationQuery,
    ) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .map(|location| {
                let score = self.score(store, &location, query);
                debug!(candidate = %location, score, "Scored candidate");
                RankedCandidate { location, score }
            })
            .collect();

        ranked.sort_by_key(|r| (Reverse(r.score), Reverse(r.location.population().unwrap_or(0))));
        ranked
    }

    /// The single best candidate, or `None` when there are no candidates.
    /// A zero score still wins if nothing scores higher.
    pub fn rank(
        &self,
        store: &dyn GazetteerStore,
        candidates: Vec<Location>,
        query: &LocationQuery,
    ) -> Option<Location> {
        self.rank_all(store, candidates, query)
            .into_iter()
            .next()
            .map(|best| best.location)
    }
}
