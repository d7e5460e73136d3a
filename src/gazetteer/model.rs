use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Granularity of a gazetteer node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocationLevel {
    Country,
    Region,
    City,
}

impl LocationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationLevel::Country => "Country",
            LocationLevel::Region => "Region",
            LocationLevel::City => "City",
        }
    }

    /// Wiki location level (Country=3, Region=4, City=5)
    pub fn wiki_level(&self) -> u8 {
        match self {
            LocationLevel::Country => 3,
            LocationLevel::Region => 4,
            LocationLevel::City => 5,
        }
    }
}

impl fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub id: String,
    pub name: String,
    /// ISO 3166-1 alpha-2 code, e.g. "US"
    pub iso: Option<String>,
    pub aliases: BTreeSet<String>,
    pub population: Option<u64>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: String,
    /// ISO 3166-2 code including the country prefix, e.g. "US-CA"
    pub iso: Option<String>,
    pub aliases: BTreeSet<String>,
    pub coordinates: Option<Coordinates>,
    pub country: Arc<Country>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id: String,
    pub name: String,
    pub aliases: BTreeSet<String>,
    pub population: Option<u64>,
    pub coordinates: Option<Coordinates>,
    pub region: Arc<Region>,
}

impl City {
    pub fn country(&self) -> &Arc<Country> {
        &self.region.country
    }
}

/// A node of the gazetteer at one of the three levels.
///
/// Parents are shared references, so walking from a city up to its country never
/// touches the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Country(Arc<Country>),
    Region(Arc<Region>),
    City(Arc<City>),
}

impl Location {
    pub fn level(&self) -> LocationLevel {
        match self {
            Location::Country(_) => LocationLevel::Country,
            Location::Region(_) => LocationLevel::Region,
            Location::City(_) => LocationLevel::City,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Location::Country(c) => &c.id,
            Location::Region(r) => &r.id,
            Location::City(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Location::Country(c) => &c.name,
            Location::Region(r) => &r.name,
            Location::City(c) => &c.name,
        }
    }

    pub fn aliases(&self) -> &BTreeSet<String> {
        match self {
            Location::Country(c) => &c.aliases,
            Location::Region(r) => &r.aliases,
            Location::City(c) => &c.aliases,
        }
    }

    /// Regions carry no population
    pub fn population(&self) -> Option<u64> {
        match self {
            Location::Country(c) => c.population,
            Location::Region(_) => None,
            Location::City(c) => c.population,
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Location::Country(c) => c.coordinates,
            Location::Region(r) => r.coordinates,
            Location::City(c) => c.coordinates,
        }
    }

    pub fn parent(&self) -> Option<Location> {
        match self {
            Location::Country(_) => None,
            Location::Region(r) => Some(Location::Country(r.country.clone())),
            Location::City(c) => Some(Location::Region(c.region.clone())),
        }
    }

    /// All labels the node is known by: its aliases plus the canonical name.
    pub fn also_known_as(&self) -> BTreeSet<String> {
        let mut labels = self.aliases().clone();
        labels.insert(self.name().to_string());
        labels
    }

    /// Wiki page title built from ISO codes: "US", "US/CA", "US/CA/Los Angeles".
    /// Falls back to the canonical name when the relevant ISO code is unknown.
    pub fn page_title(&self) -> String {
        match self {
            Location::Country(c) => c.iso.clone().unwrap_or_else(|| c.name.clone()),
            Location::Region(r) => match &r.iso {
                Some(iso) => iso.replace('-', "/"),
                None => r.name.clone(),
            },
            Location::City(c) => match &c.region.iso {
                Some(iso) => format!("{}/{}", iso.replace('-', "/"), c.name),
                None => c.name.clone(),
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.level(), self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us() -> Arc<Country> {
        Arc::new(Country {
            id: "Q30".to_string(),
            name: "United States of America".to_string(),
            iso: Some("US".to_string()),
            aliases: ["US".to_string(), "USA".to_string()].into_iter().collect(),
            population: Some(331_000_000),
            coordinates: None,
        })
    }

    fn california() -> Arc<Region> {
        Arc::new(Region {
            id: "Q99".to_string(),
            name: "California".to_string(),
            iso: Some("US-CA".to_string()),
            aliases: ["CA".to_string()].into_iter().collect(),
            coordinates: None,
            country: us(),
        })
    }

    #[test]
    fn test_parent_walk_reaches_country() {
        let city = Location::City(Arc::new(City {
            id: "Q65".to_string(),
            name: "Los Angeles".to_string(),
            aliases: BTreeSet::new(),
            population: Some(3_900_000),
            coordinates: None,
            region: california(),
        }));

        let region = city.parent().unwrap();
        assert_eq!(region.level(), LocationLevel::Region);
        let country = region.parent().unwrap();
        assert_eq!(country.id(), "Q30");
        assert!(country.parent().is_none());
    }

    #[test]
    fn test_also_known_as_includes_canonical_name() {
        let labels = Location::Region(california()).also_known_as();
        assert!(labels.contains("California"));
        assert!(labels.contains("CA"));
    }

    #[test]
    fn test_page_titles_follow_iso_path() {
        let city = Location::City(Arc::new(City {
            id: "Q65".to_string(),
            name: "Los Angeles".to_string(),
            aliases: BTreeSet::new(),
            population: None,
            coordinates: None,
            region: california(),
        }));
        assert_eq!(city.page_title(), "US/CA/Los Angeles");
        assert_eq!(city.parent().unwrap().page_title(), "US/CA");
        assert_eq!(Location::Country(us()).page_title(), "US");
    }

    #[test]
    fn test_region_has_no_population() {
        assert_eq!(Location::Region(california()).population(), None);
    }
}
