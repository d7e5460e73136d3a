/// Field names and fixed values shared across the crate

// Record fields read and written by the location fixer
pub const CITY_FIELD: &str = "city";
pub const REGION_FIELD: &str = "region";
pub const COUNTRY_FIELD: &str = "country";

pub const CITY_ID_FIELD: &str = "cityWikidataId";
pub const REGION_ID_FIELD: &str = "regionWikidataId";
pub const COUNTRY_ID_FIELD: &str = "countryWikidataId";

/// Key under which event records are grouped in a batch
pub const EVENT_TEMPLATE: &str = "Event";

/// Placeholder values found in location fields that carry no location
pub const INVALID_LOCATION_VALUES: &[&str] = &["Online", "None", "N/A"];

/// Wiki category namespace prefix
pub const CATEGORY_PREFIX: &str = "Category:";

// Ranking weights per level
pub const CITY_WEIGHT: u32 = 3;
pub const REGION_WEIGHT: u32 = 2;
pub const COUNTRY_WEIGHT: u32 = 1;

// Config file and environment variables
pub const DEFAULT_CONFIG_PATH: &str = "location_service.toml";
pub const CONFIG_PATH_ENV: &str = "LOCATION_SERVICE_CONFIG";
pub const GAZETTEER_PATH_ENV: &str = "LOCATION_GAZETTEER_PATH";
pub const NAME_STYLE_ENV: &str = "LOCATION_NAME_STYLE";
