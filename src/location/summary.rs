use serde::{Deserialize, Serialize};

use crate::gazetteer::Location;

/// Reduced representation of a gazetteer node as used by wiki location pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub name: String,
    pub wikidataid: String,
    /// "lat, lon"; missing parts are rendered as 0
    pub coordinates: String,
    #[serde(rename = "locationKind")]
    pub location_kind: String,
    pub level: u8,
    #[serde(rename = "partOf", skip_serializing_if = "Option::is_none")]
    pub part_of: Option<String>,
}

impl From<&Location> for LocationSummary {
    fn from(location: &Location) -> Self {
        let (lat, lon) = location
            .coordinates()
            .map(|c| (c.lat, c.lon))
            .unwrap_or((0.0, 0.0));

        let part_of = match location {
            Location::City(city) => Some(city.region.iso.clone().unwrap_or_default().replace('-', "/")),
            Location::Region(region) => Some(region.country.iso.clone().unwrap_or_default()),
            Location::Country(_) => None,
        };

        Self {
            name: location.name().to_string(),
            wikidataid: location.id().to_string(),
            coordinates: format!("{}, {}", lat, lon),
            location_kind: location.level().as_str().to_string(),
            level: location.level().wiki_level(),
            part_of,
        }
    }
}
