//! Gazetteer stored as SQLite lookup tables, one row per label.
//!
//! ```text
//! CountryLookup(label, name, iso, wikidataid, pop, lat, lon)
//! RegionLookup (label, name, iso, wikidataid, lat, lon, countryId)
//! CityLookup   (label, name, wikidataid, regionIso, pop, lat, lon, regionId)
//! ```
//!
//! A region's country is `countryId` when present, otherwise the country whose `iso`
//! equals the prefix of the region's `iso` ("US" for "US-CA"). A city's region is
//! `regionId` when present, otherwise the region whose `iso` equals `regionIso`.
//! Tables written elsewhere may lack the id columns.

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LocationError, Result};
use crate::gazetteer::{CityRecord, CountryRecord, GazetteerDataset, RegionRecord};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS CountryLookup (
        label       TEXT NOT NULL,
        name        TEXT NOT NULL,
        iso         TEXT,
        wikidataid  TEXT NOT NULL,
        pop         REAL,
        lat         REAL,
        lon         REAL
    );
    CREATE TABLE IF NOT EXISTS RegionLookup (
        label       TEXT NOT NULL,
        name        TEXT NOT NULL,
        iso         TEXT,
        wikidataid  TEXT NOT NULL,
        lat         REAL,
        lon         REAL,
        countryId   TEXT
    );
    CREATE TABLE IF NOT EXISTS CityLookup (
        label       TEXT NOT NULL,
        name        TEXT NOT NULL,
        wikidataid  TEXT NOT NULL,
        regionIso   TEXT,
        pop         REAL,
        lat         REAL,
        lon         REAL,
        regionId    TEXT
    );
"#;

/// Read the lookup tables of `path` into a dataset.
///
/// A row whose parent cannot be resolved fails the read with
/// [`LocationError::DanglingParent`], unless `skip_orphans` is set, in which case it is
/// dropped with a warning.
pub fn read_lookup_tables<P: AsRef<Path>>(
    path: P,
    skip_orphans: bool,
) -> Result<GazetteerDataset> {
    let conn = Connection::open_with_flags(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let countries = read_countries(&conn)?;
    let country_ids: HashSet<String> = countries.iter().map(|c| c.id.clone()).collect();
    let country_by_iso: HashMap<String, String> = countries
        .iter()
        .filter_map(|c| c.iso.as_ref().map(|iso| (iso.to_uppercase(), c.id.clone())))
        .collect();

    let mut regions = Vec::new();
    let mut skipped = 0usize;
    for (mut region, country_id) in read_regions(&conn)? {
        let country_iso = region
            .iso
            .as_deref()
            .and_then(|iso| iso.split('-').next())
            .map(str::to_uppercase);
        let parent = match &country_id {
            Some(id) => country_ids.get(id).cloned(),
            None => country_iso.as_ref().and_then(|iso| country_by_iso.get(iso).cloned()),
        };
        match parent {
            Some(parent) => {
                region.country = parent;
                regions.push(region);
            }
            None if skip_orphans => skipped += 1,
            None => {
                return Err(LocationError::DanglingParent {
                    kind: "Region",
                    id: region.id,
                    parent: country_id.or(country_iso).unwrap_or_default(),
                })
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "Skipped regions without a known country");
    }

    let region_ids: HashSet<String> = regions.iter().map(|r| r.id.clone()).collect();
    let region_by_iso: HashMap<String, String> = regions
        .iter()
        .filter_map(|r| r.iso.as_ref().map(|iso| (iso.to_uppercase(), r.id.clone())))
        .collect();

    let mut cities = Vec::new();
    let mut skipped = 0usize;
    for (mut city, region_iso, region_id) in read_cities(&conn)? {
        let parent = match &region_id {
            Some(id) => region_ids.get(id).cloned(),
            None => region_iso
                .as_ref()
                .and_then(|iso| region_by_iso.get(&iso.to_uppercase()).cloned()),
        };
        match parent {
            Some(parent) => {
                city.region = parent;
                cities.push(city);
            }
            None if skip_orphans => skipped += 1,
            None => {
                return Err(LocationError::DanglingParent {
                    kind: "City",
                    id: city.id,
                    parent: region_id.or(region_iso).unwrap_or_default(),
                })
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "Skipped cities without a known region");
    }

    debug!(
        countries = countries.len(),
        regions = regions.len(),
        cities = cities.len(),
        "Read SQLite lookup tables"
    );
    Ok(GazetteerDataset { countries, regions, cities })
}

/// Write a dataset as lookup tables, one row per label (canonical name included).
pub fn write_lookup_tables<P: AsRef<Path>>(path: P, dataset: &GazetteerDataset) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut conn = Connection::open(path.as_ref())?;
    conn.execute_batch(SCHEMA)?;

    let region_iso: HashMap<&str, Option<&str>> = dataset
        .regions
        .iter()
        .map(|r| (r.id.as_str(), r.iso.as_deref()))
        .collect();

    let tx = conn.transaction()?;
    for c in &dataset.countries {
        for label in labels(&c.name, &c.aliases) {
            tx.execute(
                "INSERT INTO CountryLookup (label, name, iso, wikidataid, pop, lat, lon)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![label, c.name, c.iso, c.id, c.population.map(|p| p as f64), c.lat, c.lon],
            )?;
        }
    }
    for r in &dataset.regions {
        for label in labels(&r.name, &r.aliases) {
            tx.execute(
                "INSERT INTO RegionLookup (label, name, iso, wikidataid, lat, lon, countryId)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![label, r.name, r.iso, r.id, r.lat, r.lon, r.country],
            )?;
        }
    }
    for c in &dataset.cities {
        let parent_iso = region_iso.get(c.region.as_str()).copied().flatten();
        for label in labels(&c.name, &c.aliases) {
            tx.execute(
                "INSERT INTO CityLookup (label, name, wikidataid, regionIso, pop, lat, lon, regionId)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    label,
                    c.name,
                    c.id,
                    parent_iso,
                    c.population.map(|p| p as f64),
                    c.lat,
                    c.lon,
                    c.region
                ],
            )?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn labels<'a>(name: &'a str, aliases: &'a [String]) -> Vec<&'a str> {
    let mut out = vec![name];
    for alias in aliases {
        if !out.contains(&alias.as_str()) {
            out.push(alias);
        }
    }
    out
}

/// `column` itself if `table` has it, otherwise a NULL placeholder for the SELECT list
fn optional_column(conn: &Connection, table: &str, column: &'static str) -> Result<&'static str> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name.eq_ignore_ascii_case(column) {
            return Ok(column);
        }
    }
    Ok("NULL")
}


fn read_countries(conn: &Connection) -> Result<Vec<CountryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT wikidataid, label, name, iso, pop, lat, lon FROM CountryLookup ORDER BY rowid",
    )?;
    let mut rows = stmt.query([])?;
    let mut grouped = Grouped::default();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let label: String = row.get(1)?;
        let population = opt_f64(row, 4)?.map(|p| p as u64);
        let record = grouped.entry(id.clone(), || CountryRecord {
            id,
            name: String::new(),
            iso: None,
            aliases: vec![],
            population: None,
            lat: None,
            lon: None,
        });
        if record.name.is_empty() {
            record.name = row.get(2)?;
            record.iso = row.get(3)?;
            record.population = population;
            record.lat = opt_f64(row, 5)?;
            record.lon = opt_f64(row, 6)?;
        }
        push_alias(&mut record.aliases, &record.name, label);
    }
    Ok(grouped.into_records())
}

/// Regions paired with the country id they reference, if the table records one
fn read_regions(conn: &Connection) -> Result<Vec<(RegionRecord, Option<String>)>> {
    let country_id = optional_column(conn, "RegionLookup", "countryId")?;
    let mut stmt = conn.prepare(&format!(
        "SELECT wikidataid, label, name, iso, lat, lon, {} FROM RegionLookup ORDER BY rowid",
        country_id
    ))?;
    let mut rows = stmt.query([])?;
    let mut grouped: Grouped<(RegionRecord, Option<String>)> = Grouped::default();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let label: String = row.get(1)?;
        let (record, country_id) = grouped.entry(id.clone(), || {
            (
                RegionRecord {
                    id,
                    name: String::new(),
                    iso: None,
                    aliases: vec![],
                    lat: None,
                    lon: None,
                    country: String::new(),
                },
                None,
            )
        });
        if record.name.is_empty() {
            record.name = row.get(2)?;
            record.iso = row.get(3)?;
            record.lat = opt_f64(row, 4)?;
            record.lon = opt_f64(row, 5)?;
            *country_id = row.get(6)?;
        }
        push_alias(&mut record.aliases, &record.name, label);
    }
    Ok(grouped.into_records())
}

/// Cities paired with the region ISO code and region id they reference
fn read_cities(conn: &Connection) -> Result<Vec<(CityRecord, Option<String>, Option<String>)>> {
    let region_id = optional_column(conn, "CityLookup", "regionId")?;
    let mut stmt = conn.prepare(&format!(
        "SELECT wikidataid, label, name, regionIso, pop, lat, lon, {} FROM CityLookup ORDER BY rowid",
        region_id
    ))?;
    let mut rows = stmt.query([])?;
    let mut grouped: Grouped<(CityRecord, Option<String>, Option<String>)> = Grouped::default();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let label: String = row.get(1)?;
        let (record, region_iso, region_id) = grouped.entry(id.clone(), || {
            (
                CityRecord {
                    id,
                    name: String::new(),
                    aliases: vec![],
                    population: None,
                    lat: None,
                    lon: None,
                    region: String::new(),
                },
                None,
                None,
            )
        });
        if record.name.is_empty() {
            record.name = row.get(2)?;
            *region_iso = row.get(3)?;
            record.population = opt_f64(row, 4)?.map(|p| p as u64);
            record.lat = opt_f64(row, 5)?;
            record.lon = opt_f64(row, 6)?;
            *region_id = row.get(7)?;
        }
        push_alias(&mut record.aliases, &record.name, label);
    }
    Ok(grouped.into_records())
}

fn push_alias(aliases: &mut Vec<String>, name: &str, label: String) {
    if label != name && !aliases.contains(&label) {
        aliases.push(label);
    }
}

/// Numeric columns in the wild hold integers, reals or text
fn opt_f64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok()),
        ValueRef::Blob(_) => None,
    })
}

/// Rows grouped by wikidata id, in first-seen order
struct Grouped<T> {
    order: Vec<T>,
    positions: HashMap<String, usize>,
}

impl<T> Default for Grouped<T> {
    fn default() -> Self {
        Self { order: Vec::new(), positions: HashMap::new() }
    }
}

impl<T> Grouped<T> {
    fn entry(&mut self, id: String, init: impl FnOnce() -> T) -> &mut T {
        let position = match self.positions.get(&id) {
            Some(&p) => p,
            None => {
                self.order.push(init());
                self.positions.insert(id, self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[position]
    }

    fn into_records(self) -> Vec<T> {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::InMemoryGazetteer;
    use crate::gazetteer::{GazetteerStore, Location};
    use tempfile::tempdir;

    fn dataset() -> GazetteerDataset {
        GazetteerDataset::from_json_str(
            r#"{
                "countries": [{"id": "Q30", "name": "United States of America", "iso": "US",
                               "aliases": ["USA", "US"], "population": 331000000},
                              {"id": "Q31", "name": "Belgium", "iso": "BE"}],
                "regions": [{"id": "Q99", "name": "California", "iso": "US-CA",
                             "aliases": ["CA"], "country": "Q30"},
                            {"id": "Q239", "name": "Brussels", "country": "Q31"}],
                "cities": [{"id": "Q65", "name": "Los Angeles", "aliases": ["LA"],
                            "population": 3898747, "lat": 34.05223, "lon": -118.24368,
                            "region": "Q99"},
                           {"id": "Q12994", "name": "City of Brussels", "region": "Q239"}]
            }"#,
        )
        .unwrap()
    }

    fn orphan_city_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("locations.db");
        write_lookup_tables(&path, &dataset()).unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "INSERT INTO CityLookup (label, name, wikidataid, regionIso, pop, lat, lon)
             VALUES ('Atlantis', 'Atlantis', 'Q0', 'XX-YY', '12', NULL, NULL)",
            [],
        )
        .unwrap();
        path
    }

    #[test]
    fn test_lookup_tables_roundtrip_keeps_hierarchy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.db");
        write_lookup_tables(&path, &dataset()).unwrap();

        let store =
            InMemoryGazetteer::from_dataset(read_lookup_tables(&path, false).unwrap()).unwrap();
        let cities = store.cities_by_alias("LA", None);
        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].id, "Q65");
        assert_eq!(cities[0].region.id, "Q99");
        assert_eq!(cities[0].country().id, "Q30");
        assert_eq!(cities[0].population, Some(3898747));
        assert!(cities[0].aliases.contains("LA"));
    }

    #[test]
    fn test_region_without_iso_keeps_its_cities() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.db");
        write_lookup_tables(&path, &dataset()).unwrap();

        let store =
            InMemoryGazetteer::from_dataset(read_lookup_tables(&path, false).unwrap()).unwrap();
        assert_eq!(store.stats().cities, 2);

        let brussels = store.cities_by_alias("City of Brussels", None);
        assert_eq!(brussels.len(), 1);
        assert_eq!(brussels[0].region.id, "Q239");
        assert_eq!(brussels[0].country().id, "Q31");

        let region = store.regions_by_alias("Brussels", None);
        assert_eq!(region[0].iso, None);
        assert_eq!(Location::Region(region[0].clone()).page_title(), "Brussels");
        assert!(store.region_by_iso("BE-Brussels").is_none());
    }

    #[test]
    fn test_orphan_city_rows_fail_the_read() {
        let dir = tempdir().unwrap();
        let path = orphan_city_db(dir.path());

        let err = read_lookup_tables(&path, false).unwrap_err();
        assert!(matches!(
            err,
            LocationError::DanglingParent { kind: "City", ref id, ref parent }
                if id == "Q0" && parent == "XX-YY"
        ));
    }

    #[test]
    fn test_orphan_city_rows_are_skipped_on_request() {
        let dir = tempdir().unwrap();
        let path = orphan_city_db(dir.path());

        let dataset = read_lookup_tables(&path, true).unwrap();
        assert_eq!(dataset.cities.len(), 2);
        assert!(dataset.cities.iter().all(|c| c.id != "Q0"));
    }

    #[test]
    fn test_tables_without_id_columns_link_by_iso() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE CountryLookup (label TEXT, name TEXT, iso TEXT, wikidataid TEXT,
                                         pop REAL, lat REAL, lon REAL);
             CREATE TABLE RegionLookup (label TEXT, name TEXT, iso TEXT, wikidataid TEXT,
                                        lat REAL, lon REAL);
             CREATE TABLE CityLookup (label TEXT, name TEXT, wikidataid TEXT, regionIso TEXT,
                                      pop REAL, lat REAL, lon REAL);
             INSERT INTO CountryLookup VALUES ('US', 'United States of America', 'US', 'Q30', NULL, NULL, NULL);
             INSERT INTO RegionLookup VALUES ('CA', 'California', 'US-CA', 'Q99', NULL, NULL);
             INSERT INTO CityLookup VALUES ('Los Angeles', 'Los Angeles', 'Q65', 'US-CA', 3898747, NULL, NULL);",
        )
        .unwrap();
        drop(conn);

        let dataset = read_lookup_tables(&path, false).unwrap();
        assert_eq!(dataset.regions[0].country, "Q30");
        assert_eq!(dataset.cities[0].region, "Q99");
    }

    #[test]
    fn test_text_population_is_parsed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locations.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO CountryLookup (label, name, iso, wikidataid, pop, lat, lon)
             VALUES ('Belgium', 'Belgium', 'BE', 'Q31', '11500000', 50.5, 4.4)",
            [],
        )
        .unwrap();
        drop(conn);

        let dataset = read_lookup_tables(&path, false).unwrap();
        assert_eq!(dataset.countries[0].population, Some(11_500_000));
    }
}
