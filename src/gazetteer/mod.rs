//! Reference gazetteer of countries, regions and cities.
//!
//! The resolution engine only sees the [`GazetteerStore`] trait. Stores are built once,
//! then shared read-only (`Arc<dyn GazetteerStore>`) across every resolution.

pub mod dataset;
pub mod memory;
pub mod model;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{LocationError, Result};

pub use dataset::{CityRecord, CountryRecord, GazetteerDataset, RegionRecord};
pub use memory::InMemoryGazetteer;
pub use model::{City, Coordinates, Country, Location, LocationLevel, Region};

/// Counts of nodes held by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerStats {
    pub countries: usize,
    pub regions: usize,
    pub cities: usize,
}

/// Read-only queries the resolution engine needs from a gazetteer
pub trait GazetteerStore: Send + Sync {
    /// Countries known under `alias` (case-insensitive)
    fn countries_by_alias(&self, alias: &str) -> Vec<Arc<Country>>;

    /// Regions known under `alias`, optionally restricted to one country id
    fn regions_by_alias(&self, alias: &str, country_id: Option<&str>) -> Vec<Arc<Region>>;

    /// Cities known under `alias`, optionally restricted to one region id
    fn cities_by_alias(&self, alias: &str, region_id: Option<&str>) -> Vec<Arc<City>>;

    /// Every label recorded for the node's identifier, canonical name included
    fn also_known_as(&self, location: &Location) -> BTreeSet<String>;

    fn location_by_id(&self, level: LocationLevel, id: &str) -> Option<Location>;

    /// Country by ISO 3166-1 code, e.g. "US"
    fn country_by_iso(&self, iso: &str) -> Option<Arc<Country>>;

    /// Region by full ISO 3166-2 code, e.g. "US-CA"
    fn region_by_iso(&self, iso: &str) -> Option<Arc<Region>>;

    fn stats(&self) -> GazetteerStats;
}

/// On-disk representations a gazetteer can be loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazetteerFormat {
    /// Pick by file extension
    #[default]
    Auto,
    Json,
    Sqlite,
}

impl GazetteerFormat {
    fn detect(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(GazetteerFormat::Json),
            Some("db") | Some("sqlite") | Some("sqlite3") => Ok(GazetteerFormat::Sqlite),
            other => Err(LocationError::UnsupportedFormat(format!(
                "cannot infer format of '{}' (extension {:?})",
                path.display(),
                other
            ))),
        }
    }
}

/// Load a gazetteer and build the in-memory indexes over it.
///
/// Nodes whose parent is missing fail the load.
pub fn load<P: AsRef<Path>>(path: P, format: GazetteerFormat) -> Result<InMemoryGazetteer> {
    load_with(path, format, false)
}

/// Like [`load`]; with `skip_orphans`, SQLite rows whose parent is missing are dropped
/// with a warning instead. JSON datasets always fail on a missing parent.
pub fn load_with<P: AsRef<Path>>(
    path: P,
    format: GazetteerFormat,
    skip_orphans: bool,
) -> Result<InMemoryGazetteer> {
    let path = path.as_ref();
    let dataset = read_dataset(path, format, skip_orphans)?;
    let store = InMemoryGazetteer::from_dataset(dataset)?;
    let stats = store.stats();
    info!(
        path = %path.display(),
        countries = stats.countries,
        regions = stats.regions,
        cities = stats.cities,
        "Gazetteer loaded"
    );
    Ok(store)
}

fn read_dataset(
    path: &Path,
    format: GazetteerFormat,
    skip_orphans: bool,
) -> Result<GazetteerDataset> {
    match format {
        GazetteerFormat::Json => GazetteerDataset::from_json_file(path),
        GazetteerFormat::Sqlite => sqlite::read_lookup_tables(path, skip_orphans),
        // detect() never yields Auto
        GazetteerFormat::Auto => read_dataset(path, GazetteerFormat::detect(path)?, skip_orphans),
    }
}

/// Case- and whitespace-insensitive key used by the alias indexes
pub(crate) fn fold_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
