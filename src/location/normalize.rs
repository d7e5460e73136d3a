use serde::{Deserialize, Serialize};

use crate::constants::{CATEGORY_PREFIX, INVALID_LOCATION_VALUES};

/// The three location fields of one resolution request, already cleaned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl LocationQuery {
    /// Build a query from raw field values, normalizing each one.
    pub fn new(city: Option<&str>, region: Option<&str>, country: Option<&str>) -> Self {
        Self {
            city: normalize_value(city),
            region: normalize_value(region),
            country: normalize_value(country),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.region.is_none() && self.country.is_none()
    }

    /// Non-empty inputs in city, region, country order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        [&self.city, &self.region, &self.country]
            .into_iter()
            .filter_map(|v| v.as_deref())
    }

    /// True if any field equals `value` exactly
    pub fn mentions(&self, value: &str) -> bool {
        self.values().any(|v| v == value)
    }
}

/// Clean a single raw location value.
///
/// Placeholder values ("Online", "None", "N/A") and empty strings become `None`,
/// a leading "Category:" is stripped, and path-like values keep only their last segment.
/// Unlike a single pass, the rules are reapplied until the value stops changing, so a
/// cleaned value always cleans to itself. A sentinel behind a path therefore also
/// becomes `None`: "Conferences/Online" yields `None`, where one pass would give "Online".
pub fn normalize_value(value: Option<&str>) -> Option<String> {
    let mut current = value?;
    loop {
        if current.is_empty() || INVALID_LOCATION_VALUES.contains(&current) {
            return None;
        }
        let stripped = current.strip_prefix(CATEGORY_PREFIX).unwrap_or(current);
        let next = match stripped.rsplit_once('/') {
            Some((_, last)) => last,
            None => stripped,
        };
        if next == current {
            return Some(current.to_string());
        }
        current = next;
    }
}

/// Normalize a raw (city, region, country) triple.
pub fn normalize(
    city: Option<&str>,
    region: Option<&str>,
    country: Option<&str>,
) -> (Option<String>, Option<String>, Option<String>) {
    let query = LocationQuery::new(city, region, country);
    (query.city, query.region, query.country)
}
