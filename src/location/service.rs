use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::constants::EVENT_TEMPLATE;
use crate::error::{LocationError, Result};
use crate::gazetteer::{self, GazetteerStore, Location, LocationLevel};
use crate::location::{
    EventRecord, LocationResolver, LocationSummary, NameStyle, Ranker, RecordFixer,
    ResolutionErrors,
};
use crate::observability::metrics;

const DEFAULT_CHUNK_SIZE: usize = 256;

/// Records grouped by template name, e.g. `{"Event": [...]}`
pub type RecordSets = BTreeMap<String, Vec<EventRecord>>;

/// Outcome of a batch enhancement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancementReport {
    pub total_records: usize,
    pub resolved_city: usize,
    pub resolved_region: usize,
    pub resolved_country: usize,
    pub unresolved: usize,
    /// Diagnostics per record, keyed by position in the event list
    pub errors: BTreeMap<usize, ResolutionErrors>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl EnhancementReport {
    fn count(&mut self, granularity: Option<LocationLevel>) {
        match granularity {
            Some(LocationLevel::City) => self.resolved_city += 1,
            Some(LocationLevel::Region) => self.resolved_region += 1,
            Some(LocationLevel::Country) => self.resolved_country += 1,
            None => self.unresolved += 1,
        }
    }
}

/// Entry point over a loaded gazetteer: resolution, record fixing, batch enhancement
/// and direct lookups by ISO code.
#[derive(Debug, Clone)]
pub struct LocationService {
    fixer: RecordFixer,
    chunk_size: usize,
}

impl LocationService {
    pub fn new(store: Arc<dyn GazetteerStore>) -> Self {
        Self {
            fixer: RecordFixer::new(LocationResolver::new(store)),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_options(
        store: Arc<dyn GazetteerStore>,
        ranker: Ranker,
        name_style: NameStyle,
        chunk_size: usize,
    ) -> Self {
        Self {
            fixer: RecordFixer::with_name_style(
                LocationResolver::with_ranker(store, ranker),
                name_style,
            ),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Load the configured gazetteer and set up ranking and write-back from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config.gazetteer.path.as_ref().ok_or_else(|| {
            LocationError::Config("No gazetteer path configured".to_string())
        })?;
        let store = gazetteer::load_with(
            path,
            config.gazetteer.format,
            config.gazetteer.skip_orphans,
        )?;

        let mut ranker = Ranker::new();
        for rule in &config.ranking.overrides {
            ranker.add_override(rule.clone());
        }

        Ok(Self::with_options(
            Arc::new(store),
            ranker,
            config.fixer.name_style,
            config.batch.chunk_size,
        ))
    }

    pub fn resolver(&self) -> &LocationResolver {
        self.fixer.resolver()
    }

    pub fn store(&self) -> &dyn GazetteerStore {
        self.resolver().store()
    }

    pub fn resolve(
        &self,
        city: Option<&str>,
        region: Option<&str>,
        country: Option<&str>,
    ) -> Option<Location> {
        self.resolver().resolve(city, region, country)
    }

    pub fn fix_location(
        &self,
        record: &mut EventRecord,
        errors: &mut ResolutionErrors,
    ) -> Option<LocationLevel> {
        self.fixer.fix_location(record, errors)
    }

    pub fn get_country(&self, country_iso: &str) -> Option<Location> {
        self.store().country_by_iso(country_iso).map(Location::Country)
    }

    /// Region by country code and the region part of its ISO code ("US", "CA")
    pub fn get_region(&self, country_iso: &str, region_iso: &str) -> Option<Location> {
        self.store()
            .region_by_iso(&format!("{}-{}", country_iso, region_iso))
            .map(Location::Region)
    }

    pub fn get_city(&self, country_iso: &str, region_iso: &str, name: &str) -> Option<Location> {
        let region = self
            .store()
            .region_by_iso(&format!("{}-{}", country_iso, region_iso))?;
        self.store()
            .cities_by_alias(name, Some(&region.id))
            .into_iter()
            .next()
            .map(Location::City)
    }

    /// Summary for a wiki location path: "US", "US/CA" or "US/CA/Los Angeles".
    pub fn lookup_by_path(&self, path: &str) -> Option<LocationSummary> {
        let parts: Vec<&str> = path.split('/').collect();
        let location = match parts.as_slice() {
            [country] => self.get_country(country),
            [country, region] => self.get_region(country, region),
            [country, region, city] => self.get_city(country, region, city),
            _ => None,
        }?;
        Some(LocationSummary::from(&location))
    }

    /// Fix the location of every record under the event template.
    ///
    /// Records are resolved in chunks on the blocking pool; output order matches input.
    #[instrument(skip(self, sets))]
    pub async fn enhance(&self, mut sets: RecordSets) -> Result<(RecordSets, EnhancementReport)> {
        let mut report = EnhancementReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };
        let start = Instant::now();

        let Some(mut remaining) = sets.remove(EVENT_TEMPLATE) else {
            info!("No event records to enhance");
            report.finished_at = Some(Utc::now());
            return Ok((sets, report));
        };
        report.total_records = remaining.len();

        let mut handles = Vec::new();
        while !remaining.is_empty() {
            let rest = remaining.split_off(self.chunk_size.min(remaining.len()));
            let chunk = std::mem::replace(&mut remaining, rest);
            let fixer = self.fixer.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|mut record| {
                        let mut errors = ResolutionErrors::new();
                        let granularity = fixer.fix_location(&mut record, &mut errors);
                        (record, granularity, errors)
                    })
                    .collect::<Vec<_>>()
            }));
        }

        let mut fixed = Vec::with_capacity(report.total_records);
        for handle in handles {
            let results = handle
                .await
                .map_err(|e| LocationError::Task(e.to_string()))?;
            for (record, granularity, errors) in results {
                report.count(granularity);
                if !errors.is_empty() {
                    report.errors.insert(fixed.len(), errors);
                }
                fixed.push(record);
            }
        }
        sets.insert(EVENT_TEMPLATE.to_string(), fixed);

        report.finished_at = Some(Utc::now());
        metrics::batch::batch_processed(report.total_records, start.elapsed().as_secs_f64());
        info!(
            total = report.total_records,
            city = report.resolved_city,
            region = report.resolved_region,
            country = report.resolved_country,
            unresolved = report.unresolved,
            "Location enhancement finished"
        );
        if report.unresolved > 0 {
            warn!("{} records matched no location", report.unresolved);
        }

        Ok((sets, report))
    }
}
