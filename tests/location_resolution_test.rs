use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use location_service::gazetteer::{GazetteerDataset, InMemoryGazetteer};
use location_service::location::service::RecordSets;
use location_service::location::{LocationService, NameStyle, Ranker};
use location_service::{EventRecord, LocationLevel, ResolutionErrors};

const SAMPLE_GAZETTEER: &str = include_str!("../data/gazetteer.sample.json");

fn sample_store() -> Result<Arc<InMemoryGazetteer>> {
    let dataset = GazetteerDataset::from_json_str(SAMPLE_GAZETTEER)?;
    Ok(Arc::new(InMemoryGazetteer::from_dataset(dataset)?))
}

fn sample_service() -> Result<LocationService> {
    Ok(LocationService::new(sample_store()?))
}

fn record(value: serde_json::Value) -> EventRecord {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn test_full_triple_resolves_to_city() -> Result<()> {
    let service = sample_service()?;
    let mut event = record(json!({"city": "Los Angeles", "region": "CA", "country": "US"}));
    let mut errors = ResolutionErrors::new();

    let granularity = service.fix_location(&mut event, &mut errors);

    assert_eq!(granularity, Some(LocationLevel::City));
    assert!(errors.is_empty());
    assert_eq!(event["city"], "Los Angeles");
    assert_eq!(event["cityWikidataId"], "Q65");
    assert_eq!(event["region"], "California");
    assert_eq!(event["regionWikidataId"], "Q99");
    assert_eq!(event["country"], "United States of America");
    assert_eq!(event["countryWikidataId"], "Q30");
    Ok(())
}

#[test]
fn test_ambiguous_city_picks_the_one_in_the_named_country() -> Result<()> {
    let service = sample_service()?;
    let mut event = record(json!({"city": "Boston", "country": "USA"}));
    let mut errors = ResolutionErrors::new();

    let granularity = service.fix_location(&mut event, &mut errors);

    assert_eq!(granularity, Some(LocationLevel::City));
    assert_eq!(event["cityWikidataId"], "Q100");
    assert_eq!(event["region"], "Massachusetts");
    assert_eq!(event["regionWikidataId"], "Q771");
    assert!(errors.is_empty());
    Ok(())
}

#[test]
fn test_unknown_city_falls_back_to_region() -> Result<()> {
    let service = sample_service()?;
    let mut event = record(json!({"city": "Unknown Town", "region": "CA", "country": "US"}));
    let mut errors = ResolutionErrors::new();

    let granularity = service.fix_location(&mut event, &mut errors);

    assert_eq!(granularity, Some(LocationLevel::Region));
    assert_eq!(event["city"], "Unknown Town");
    assert!(event.get("cityWikidataId").is_none());
    assert_eq!(event["regionWikidataId"], "Q99");
    assert_eq!(event["countryWikidataId"], "Q30");
    assert_eq!(
        errors.get("city_unknown").map(String::as_str),
        Some("Location information did not match any city")
    );
    Ok(())
}

#[test]
fn test_unmatched_country_leaves_record_untouched() -> Result<()> {
    let service = sample_service()?;
    let original = record(json!({"name": "Meetup", "country": "Nowhereistan"}));
    let mut event = original.clone();
    let mut errors = ResolutionErrors::new();

    let granularity = service.fix_location(&mut event, &mut errors);

    assert_eq!(granularity, None);
    assert_eq!(event, original);
    assert_eq!(
        errors.get("country_unknown").map(String::as_str),
        Some("Location information did not match any location")
    );
    Ok(())
}

#[test]
fn test_sentinels_and_category_prefixes_are_normalized() -> Result<()> {
    let service = sample_service()?;

    let online = service.resolve(Some("Online"), Some("N/A"), Some("None"));
    assert!(online.is_none());

    let best = service
        .resolve(Some("Category:Boston"), None, Some("Countries/USA"))
        .map(|location| location.id().to_string());
    assert_eq!(best.as_deref(), Some("Q100"));
    Ok(())
}

#[test]
fn test_brussels_override_prefers_the_administrative_node() -> Result<()> {
    let service = sample_service()?;

    for (city, region, country) in [
        (Some("Brussels"), Some("Brussels"), Some("Belgium")),
        (None, Some("Brussels"), Some("Belgium")),
        (None, None, Some("Brussels")),
    ] {
        let best = service.resolve(city, region, country);
        assert_eq!(
            best.as_ref().map(|l| (l.level(), l.id().to_string())),
            Some((LocationLevel::Region, "Q239".to_string())),
            "input {:?}/{:?}/{:?}",
            city,
            region,
            country
        );
    }
    Ok(())
}

#[test]
fn test_brussels_in_city_field_alone_ties_and_population_decides() -> Result<()> {
    let service = sample_service()?;

    // City 3+1 and Q239 1+3 tie; the region has no population
    let query = location_service::LocationQuery::new(Some("Brussels"), None, Some("Belgium"));
    let ranked = service.resolver().explain(&query);
    assert_eq!(ranked[0].score, 4);
    assert_eq!(ranked[1].score, 4);
    assert_eq!(ranked[0].location.id(), "Q12994");
    assert_eq!(ranked[1].location.id(), "Q239");

    let best = service.resolve(Some("Brussels"), None, Some("Belgium"));
    assert_eq!(best.map(|l| l.level()), Some(LocationLevel::City));
    Ok(())
}

#[test]
fn test_without_overrides_the_populous_city_wins() -> Result<()> {
    let service = LocationService::with_options(
        sample_store()?,
        Ranker::with_overrides(Vec::new()),
        NameStyle::Canonical,
        16,
    );

    let best = service.resolve(Some("Brussels"), Some("Brussels"), Some("Belgium"));
    assert_eq!(best.map(|l| l.id().to_string()).as_deref(), Some("Q12994"));
    Ok(())
}

#[test]
fn test_population_breaks_ties_between_equal_scores() -> Result<()> {
    let service = sample_service()?;

    // Both Bostons score 3 on the city field alone
    let ranked = service
        .resolver()
        .explain(&location_service::LocationQuery::new(Some("Boston"), None, None));
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].score, ranked[1].score);
    assert_eq!(ranked[0].location.id(), "Q100");
    assert_eq!(ranked[1].location.id(), "Q311975");
    Ok(())
}

#[test]
fn test_page_title_name_style() -> Result<()> {
    let service =
        LocationService::with_options(sample_store()?, Ranker::new(), NameStyle::PageTitle, 16);
    let mut event = record(json!({"city": "LA", "region": "California", "country": "US"}));
    let mut errors = ResolutionErrors::new();

    service.fix_location(&mut event, &mut errors);

    assert_eq!(event["city"], "US/CA/Los Angeles");
    assert_eq!(event["region"], "US/CA");
    assert_eq!(event["country"], "US");
    Ok(())
}

#[test]
fn test_lookup_by_path() -> Result<()> {
    let service = sample_service()?;

    let summary = service.lookup_by_path("US/CA/Los Angeles").map(|s| s.wikidataid);
    assert_eq!(summary.as_deref(), Some("Q65"));
    assert_eq!(
        service.lookup_by_path("GB").map(|s| s.name).as_deref(),
        Some("United Kingdom")
    );
    assert!(service.lookup_by_path("US/ZZ").is_none());
    assert!(service.lookup_by_path("").is_none());
    Ok(())
}

#[tokio::test]
async fn test_enhance_batch_preserves_order_and_reports_issues() -> Result<()> {
    let service =
        LocationService::with_options(sample_store()?, Ranker::new(), NameStyle::Canonical, 2);

    let mut sets = RecordSets::new();
    sets.insert(
        "Event".to_string(),
        vec![
            record(json!({"acronym": "A", "city": "Los Angeles", "region": "CA", "country": "US"})),
            record(json!({"acronym": "B", "city": "Unknown Town", "region": "CA", "country": "US"})),
            record(json!({"acronym": "C", "country": "USA"})),
            record(json!({"acronym": "D", "city": "Online"})),
            record(json!({"acronym": "E", "city": "Boston", "country": "UK"})),
        ],
    );
    sets.insert(
        "Series".to_string(),
        vec![record(json!({"acronym": "S", "city": "Boston"}))],
    );

    let (sets, report) = service.enhance(sets).await?;

    let events = &sets["Event"];
    let acronyms: Vec<_> = events.iter().map(|e| e["acronym"].clone()).collect();
    assert_eq!(acronyms, vec!["A", "B", "C", "D", "E"]);
    assert_eq!(events[4]["cityWikidataId"], "Q311975");

    assert_eq!(report.total_records, 5);
    assert_eq!(report.resolved_city, 2);
    assert_eq!(report.resolved_region, 1);
    assert_eq!(report.resolved_country, 1);
    assert_eq!(report.unresolved, 1);
    assert!(report.errors[&1].contains_key("city_unknown"));
    assert!(report.errors[&2].contains_key("region_unknown"));
    assert!(report.errors[&3].contains_key("country_unknown"));
    assert!(!report.errors.contains_key(&0));

    // Other templates pass through unchanged
    assert!(sets["Series"][0].get("cityWikidataId").is_none());
    Ok(())
}
