// End-to-end scenarios: CSV sources → loader → matcher → aggregator

use fmr_atlas::{
    load_census, load_county_geoids, load_hud_fmr, load_minimum_wages, Aggregator,
    AggregatorConfig, BedroomType, CountyId, CountyMatcher, CountyRecord, Metric, Pipeline,
    StatsOutcome, StatsQuery, TableCache,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn county(id: &str, name: &str, state: &str) -> CountyRecord {
    CountyRecord {
        id: CountyId::new(id),
        county_name: Some(name.to_string()),
        state_name: state.to_string(),
        geometry: None,
    }
}

const HUD: &str = "state,countyname,fmr_0,fmr_1,fmr_2,fmr_3,fmr_4\n\
                   29,St. Louis,800,900,1000,1300,1500\n\
                   29,Jackson County,900,1100,1500,1900,2200\n\
                   29,Boone County,1100,1300,2000,2500,2800\n\
                   29,Empty County,0,0,0,0,0\n";

const CENSUS: &str = "GEOID,NAME,median_gross_rent,median_household_income\n\
                      29189,\"Saint Louis County, Missouri\",1100,72000\n\
                      29095,\"Jackson County, Missouri\",1200,-666666666\n\
                      29019,\"Boone County, Missouri\",1000,60000\n";

#[test]
fn st_louis_fuzzy_matches_saint_louis_county() {
    let left = vec![county("L1", "St. Louis", "MO")];
    let right = vec![county("R1", "Saint Louis County", "MO")];

    let report = CountyMatcher::new().match_records(&left, &right).unwrap();

    assert_eq!(report.matched_count(), 1);
    assert!(report.matches[0].confidence >= 80);
    assert_eq!(report.matches[0].right_id.as_str(), "R1");
}

#[test]
fn disjoint_tables_produce_only_unmatched() {
    let left = vec![county("L1", "Travis County", "TX"), county("L2", "King County", "WA")];
    let right = vec![county("R1", "Cook County", "IL")];

    let report = CountyMatcher::new().match_records(&left, &right).unwrap();

    assert_eq!(report.matched_count(), 0);
    assert_eq!(report.unmatched_count(), 2);
}

#[test]
fn three_county_two_bedroom_statistics() {
    let hud = csv_file(
        "GEOID,county_name,state_name,fmr_0,fmr_1,fmr_2,fmr_3,fmr_4\n\
         01001,County A,Alabama,,,1000,,\n\
         01003,County B,Alabama,,,1500,,\n\
         01005,County C,Alabama,,,2000,,\n",
    );
    let rents = load_hud_fmr(hud.path()).unwrap();

    let bedroom: BedroomType = "2 Bedroom".parse().unwrap();
    let outcome = Aggregator::new().summarize_rents(&rents, bedroom, None);
    let summary = outcome.summary().unwrap();

    assert_eq!(summary.mean, 1500.0);
    assert_eq!((summary.min.value, summary.min.county_name.as_str()), (1000.0, "County A"));
    assert_eq!((summary.max.value, summary.max.county_name.as_str()), (2000.0, "County C"));
    assert!((summary.std_dev - 408.25).abs() < 0.01);
}

#[test]
fn loaded_sources_flow_through_the_pipeline() {
    let hud = csv_file(HUD);
    let census = csv_file(CENSUS);
    let wages = csv_file("state_fips,min_wage\n29,12.30\n");

    let rents = load_hud_fmr(hud.path()).unwrap();
    let markets = load_census(census.path()).unwrap();
    assert_eq!(rents.len(), 3, "all-zero FMR county is dropped at load");

    let config = AggregatorConfig {
        minimum_wages: load_minimum_wages(wages.path()).unwrap(),
        ..AggregatorConfig::default()
    };
    let pipeline = Pipeline {
        aggregator: Aggregator::with_config(config),
        ..Pipeline::new()
    };

    let report = pipeline
        .run(&rents, &markets, None, BedroomType::TwoBedroom)
        .unwrap();

    assert_eq!(report.match_report.matched_count(), 3);
    assert_eq!(report.match_report.exact_count(), 2);
    assert_eq!(report.match_report.fuzzy_count(), 1);

    // Jackson's income is an ACS sentinel, so it has no derived metrics
    assert_eq!(report.derived.len(), 2);
    assert!(!report.derived.contains_key(&CountyId::new("29:Jackson County")));

    let ratio = report
        .outcome(Metric::RentToIncomeRatio)
        .and_then(StatsOutcome::summary)
        .unwrap();
    assert_eq!(ratio.count, 2);
    assert_eq!(ratio.excluded, 1);

    let wage_ratio = report
        .outcome(Metric::HousingWageToMinimumWage)
        .and_then(StatsOutcome::summary)
        .unwrap();
    assert_eq!(wage_ratio.count, 3);

    let gap = report
        .outcome(Metric::AffordabilityGap)
        .and_then(StatsOutcome::summary)
        .unwrap();
    assert_eq!(gap.min.value, -100.0);
    assert_eq!(gap.max.value, 1000.0);
}

#[test]
fn county_table_assigns_geoids() {
    let hud = csv_file(HUD);
    let geoids = csv_file(
        "STATEFP,GEOID,county_name\n\
         29,29189,ST. LOUIS COUNTY\n\
         29,29095,JACKSON COUNTY\n\
         29,29019,BOONE COUNTY\n",
    );

    let rents = load_hud_fmr(hud.path()).unwrap();
    let counties = load_county_geoids(geoids.path()).unwrap();

    let (resolved, report) = Pipeline::new().resolve_county_ids(&rents, &counties).unwrap();

    assert_eq!(report.unmatched_count(), 0);
    let ids: Vec<&str> = resolved.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["29189", "29095", "29019"]);
}

#[test]
fn empty_filtered_set_is_an_empty_outcome() {
    let hud = csv_file(HUD);
    let rents = load_hud_fmr(hud.path()).unwrap();

    let outcome = Aggregator::new().summarize_rents(&rents, BedroomType::TwoBedroom, Some("TX"));
    assert!(outcome.is_empty());

    let records = Pipeline::new()
        .run(&rents, &load_census(csv_file(CENSUS).path()).unwrap(), None, BedroomType::Studio)
        .unwrap()
        .matched;
    let burden = Aggregator::new().summarize(&records, &StatsQuery::new(BedroomType::Studio, Metric::CostBurden));
    assert!(burden.is_empty());
}

#[test]
fn repeated_runs_are_identical() {
    let rents = load_hud_fmr(csv_file(HUD).path()).unwrap();
    let markets = load_census(csv_file(CENSUS).path()).unwrap();
    let pipeline = Pipeline::new();

    let first = pipeline.run(&rents, &markets, None, BedroomType::ThreeBedroom).unwrap();
    let second = pipeline.run(&rents, &markets, None, BedroomType::ThreeBedroom).unwrap();

    assert_eq!(first.match_report, second.match_report);
    assert_eq!(first.matched, second.matched);
    assert_eq!(first.statistics, second.statistics);
    assert_eq!(first.derived, second.derived);
}

#[test]
fn cache_serves_loaded_tables() {
    let hud = csv_file(HUD);
    let mut cache = TableCache::new();

    let first = cache.get_or_load(hud.path(), load_hud_fmr).unwrap();
    let second = cache.get_or_load(hud.path(), load_hud_fmr).unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(cache.stats().hits, 1);
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(cache.entry(hud.path()).unwrap().fingerprint.len(), 64);
}
