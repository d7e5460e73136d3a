use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::error::{LocationError, Result};
use crate::gazetteer::dataset::{coordinates, GazetteerDataset};
use crate::gazetteer::{
    fold_key, City, Country, GazetteerStats, GazetteerStore, Location, LocationLevel, Region,
};

/// Gazetteer held entirely in memory with alias, id and ISO indexes.
///
/// Index entries point into the node vectors, so lookups return nodes in dataset order.
#[derive(Debug, Default)]
pub struct InMemoryGazetteer {
    countries: Vec<Arc<Country>>,
    regions: Vec<Arc<Region>>,
    cities: Vec<Arc<City>>,
    country_ids: HashMap<String, usize>,
    region_ids: HashMap<String, usize>,
    city_ids: HashMap<String, usize>,
    country_aliases: HashMap<String, Vec<usize>>,
    region_aliases: HashMap<String, Vec<usize>>,
    city_aliases: HashMap<String, Vec<usize>>,
    country_iso: HashMap<String, usize>,
    region_iso: HashMap<String, usize>,
}

impl InMemoryGazetteer {
    /// Build the store, failing on duplicate ids or parents that do not exist.
    pub fn from_dataset(dataset: GazetteerDataset) -> Result<Self> {
        let mut store = Self::default();

        for record in dataset.countries {
            if store.country_ids.contains_key(&record.id) {
                return Err(LocationError::DuplicateId { kind: "Country", id: record.id });
            }
            let country = Arc::new(Country {
                id: record.id,
                name: record.name,
                iso: record.iso,
                aliases: record.aliases.into_iter().collect(),
                population: record.population,
                coordinates: coordinates(record.lat, record.lon),
            });
            let index = store.countries.len();
            store.country_ids.insert(country.id.clone(), index);
            if let Some(iso) = &country.iso {
                store.country_iso.insert(iso.to_uppercase(), index);
            }
            index_labels(&mut store.country_aliases, &country.name, &country.aliases, index);
            store.countries.push(country);
        }

        for record in dataset.regions {
            if store.region_ids.contains_key(&record.id) {
                return Err(LocationError::DuplicateId { kind: "Region", id: record.id });
            }
            let country = store
                .country_ids
                .get(&record.country)
                .map(|&i| store.countries[i].clone())
                .ok_or_else(|| LocationError::DanglingParent {
                    kind: "Region",
                    id: record.id.clone(),
                    parent: record.country.clone(),
                })?;
            let region = Arc::new(Region {
                id: record.id,
                name: record.name,
                iso: record.iso,
                aliases: record.aliases.into_iter().collect(),
                coordinates: coordinates(record.lat, record.lon),
                country,
            });
            let index = store.regions.len();
            store.region_ids.insert(region.id.clone(), index);
            if let Some(iso) = &region.iso {
                store.region_iso.insert(iso.to_uppercase(), index);
            }
            index_labels(&mut store.region_aliases, &region.name, &region.aliases, index);
            store.regions.push(region);
        }

        for record in dataset.cities {
            if store.city_ids.contains_key(&record.id) {
                return Err(LocationError::DuplicateId { kind: "City", id: record.id });
            }
            let region = store
                .region_ids
                .get(&record.region)
                .map(|&i| store.regions[i].clone())
                .ok_or_else(|| LocationError::DanglingParent {
                    kind: "City",
                    id: record.id.clone(),
                    parent: record.region.clone(),
                })?;
            let city = Arc::new(City {
                id: record.id,
                name: record.name,
                aliases: record.aliases.into_iter().collect(),
                population: record.population,
                coordinates: coordinates(record.lat, record.lon),
                region,
            });
            let index = store.cities.len();
            store.city_ids.insert(city.id.clone(), index);
            index_labels(&mut store.city_aliases, &city.name, &city.aliases, index);
            store.cities.push(city);
        }

        debug!(
            countries = store.countries.len(),
            regions = store.regions.len(),
            cities = store.cities.len(),
            "Built in-memory gazetteer"
        );
        Ok(store)
    }

    pub fn countries(&self) -> &[Arc<Country>] {
        &self.countries
    }

    pub fn regions(&self) -> &[Arc<Region>] {
        &self.regions
    }

    pub fn cities(&self) -> &[Arc<City>] {
        &self.cities
    }
}

fn index_labels(
    index: &mut HashMap<String, Vec<usize>>,
    name: &str,
    aliases: &BTreeSet<String>,
    position: usize,
) {
    let mut keys: BTreeSet<String> = aliases.iter().map(|a| fold_key(a)).collect();
    keys.insert(fold_key(name));
    for key in keys.into_iter().filter(|k| !k.is_empty()) {
        index.entry(key).or_default().push(position);
    }
}

fn lookup<'a, T>(
    index: &'a HashMap<String, Vec<usize>>,
    nodes: &'a [Arc<T>],
    alias: &str,
) -> impl Iterator<Item = &'a Arc<T>> + 'a {
    index
        .get(&fold_key(alias))
        .into_iter()
        .flatten()
        .map(move |&i| &nodes[i])
}

impl GazetteerStore for InMemoryGazetteer {
    fn countries_by_alias(&self, alias: &str) -> Vec<Arc<Country>> {
        lookup(&self.country_aliases, &self.countries, alias)
            .cloned()
            .collect()
    }

    fn regions_by_alias(&self, alias: &str, country_id: Option<&str>) -> Vec<Arc<Region>> {
        lookup(&self.region_aliases, &self.regions, alias)
            .filter(|r| country_id.map_or(true, |id| r.country.id == id))
            .cloned()
            .collect()
    }

    fn cities_by_alias(&self, alias: &str, region_id: Option<&str>) -> Vec<Arc<City>> {
        lookup(&self.city_aliases, &self.cities, alias)
            .filter(|c| region_id.map_or(true, |id| c.region.id == id))
            .cloned()
            .collect()
    }

    fn also_known_as(&self, location: &Location) -> BTreeSet<String> {
        // Labels live on the node itself; resolve through the id index so a node
        // built elsewhere still gets this store's labels.
        self.location_by_id(location.level(), location.id())
            .unwrap_or_else(|| location.clone())
            .also_known_as()
    }

    fn location_by_id(&self, level: LocationLevel, id: &str) -> Option<Location> {
        match level {
            LocationLevel::Country => self
                .country_ids
                .get(id)
                .map(|&i| Location::Country(self.countries[i].clone())),
            LocationLevel::Region => self
                .region_ids
                .get(id)
                .map(|&i| Location::Region(self.regions[i].clone())),
            LocationLevel::City => self
                .city_ids
                .get(id)
                .map(|&i| Location::City(self.cities[i].clone())),
        }
    }

    fn country_by_iso(&self, iso: &str) -> Option<Arc<Country>> {
        self.country_iso
            .get(&iso.trim().to_uppercase())
            .map(|&i| self.countries[i].clone())
    }

    fn region_by_iso(&self, iso: &str) -> Option<Arc<Region>> {
        self.region_iso
            .get(&iso.trim().to_uppercase())
            .map(|&i| self.regions[i].clone())
    }

    fn stats(&self) -> GazetteerStats {
        GazetteerStats {
            countries: self.countries.len(),
            regions: self.regions.len(),
            cities: self.cities.len(),
        }
    }
}
