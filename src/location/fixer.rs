use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::constants::{
    CITY_FIELD, CITY_ID_FIELD, COUNTRY_FIELD, COUNTRY_ID_FIELD, REGION_FIELD, REGION_ID_FIELD,
};
use crate::error::LocationError;
use crate::gazetteer::{Location, LocationLevel};
use crate::location::{LocationQuery, LocationResolver};
use crate::observability::metrics;

/// An external record being fixed, field name → value
pub type EventRecord = serde_json::Map<String, Value>;

/// Diagnostics collected while fixing a record, key → message
pub type ResolutionErrors = BTreeMap<String, String>;

/// How far resolution of a record fell short
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationIssue {
    /// Matched a region or country only
    CityUnknown,
    /// Matched a country only
    RegionUnknown,
    /// Matched nothing
    CountryUnknown,
}

impl LocationIssue {
    pub fn key(&self) -> &'static str {
        match self {
            LocationIssue::CityUnknown => "city_unknown",
            LocationIssue::RegionUnknown => "region_unknown",
            LocationIssue::CountryUnknown => "country_unknown",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LocationIssue::CityUnknown => "Location information did not match any city",
            LocationIssue::RegionUnknown => {
                "Location information did not match any region or city"
            }
            LocationIssue::CountryUnknown => "Location information did not match any location",
        }
    }

    /// The issue implied by resolving at `granularity` (`None` = no match)
    pub fn for_granularity(granularity: Option<LocationLevel>) -> Option<Self> {
        match granularity {
            Some(LocationLevel::City) => None,
            Some(LocationLevel::Region) => Some(LocationIssue::CityUnknown),
            Some(LocationLevel::Country) => Some(LocationIssue::RegionUnknown),
            None => Some(LocationIssue::CountryUnknown),
        }
    }
}

/// What gets written into the name fields of a fixed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    /// The node's canonical name, e.g. "Los Angeles"
    #[default]
    Canonical,
    /// The ISO-path wiki page title, e.g. "US/CA/Los Angeles"
    PageTitle,
}

impl FromStr for NameStyle {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "canonical" => Ok(NameStyle::Canonical),
            "page_title" | "page-title" => Ok(NameStyle::PageTitle),
            other => Err(LocationError::Config(format!("Unknown name style: {}", other))),
        }
    }
}

impl NameStyle {
    fn render(&self, location: &Location) -> String {
        match self {
            NameStyle::Canonical => location.name().to_string(),
            NameStyle::PageTitle => location.page_title(),
        }
    }
}

/// Resolves the location fields of a record and writes the normalized result back.
#[derive(Debug, Clone)]
pub struct RecordFixer {
    resolver: LocationResolver,
    name_style: NameStyle,
}

impl RecordFixer {
    pub fn new(resolver: LocationResolver) -> Self {
        Self::with_name_style(resolver, NameStyle::default())
    }

    pub fn with_name_style(resolver: LocationResolver, name_style: NameStyle) -> Self {
        Self { resolver, name_style }
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn name_style(&self) -> NameStyle {
        self.name_style
    }

    /// Fix the `city`/`region`/`country` fields of `record` in place.
    ///
    /// Fields above the matched granularity are overwritten together with their ids;
    /// fields below it are left as they were and a diagnostic is added to `errors`.
    /// Returns the granularity of the match.
    pub fn fix_location(
        &self,
        record: &mut EventRecord,
        errors: &mut ResolutionErrors,
    ) -> Option<LocationLevel> {
        let query = LocationQuery::new(
            text_field(record, CITY_FIELD),
            text_field(record, REGION_FIELD),
            text_field(record, COUNTRY_FIELD),
        );

        let best = self.resolver.resolve_query(&query);
        let granularity = best.as_ref().map(Location::level);

        let mut level = best;
        while let Some(location) = level {
            let (name_field, id_field) = match &location {
                Location::City(_) => (CITY_FIELD, CITY_ID_FIELD),
                Location::Region(_) => (REGION_FIELD, REGION_ID_FIELD),
                Location::Country(_) => (COUNTRY_FIELD, COUNTRY_ID_FIELD),
            };
            record.insert(name_field.to_string(), Value::String(self.name_style.render(&location)));
            record.insert(id_field.to_string(), Value::String(location.id().to_string()));
            level = location.parent();
        }

        match LocationIssue::for_granularity(granularity) {
            Some(issue) => {
                warn!(issue = issue.key(), ?query, "Location only partially resolved");
                metrics::fixer::issue_recorded(issue.key());
                errors.insert(issue.key().to_string(), issue.message().to_string());
            }
            None => debug!(?query, "Location fully resolved"),
        }
        metrics::fixer::record_fixed();

        granularity
    }
}

/// String value of a field; anything else counts as absent
fn text_field<'a>(record: &'a EventRecord, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}
