// 📂 Loader - CSV source tables → typed records
//
// Source layouts:
//   HUD FMR        GEOID | fips | state/state_name + countyname, fmr_0..fmr_4
//   Census ACS     GEOID | state_fips + county_fips, NAME, median_gross_rent,
//                  median_household_income, B25070 cost burden counts
//   Zillow ZORI    RegionName, StateName, StateCodeFIPS, MunicipalCodeFIPS,
//                  one column per month ("2024-12-31")
//   County GEOID   STATEFP, GEOID, county_name, optional geometry
//   Minimum wage   state_fips | state, min_wage
//
// Null rules: FMR <= 0 is missing, negative Census values (ACS sentinels
// like -666666666) are missing, and HUD rows with no FMR at all are dropped.

use crate::error::InputError;
use crate::records::{
    CostBurden, CountyId, CountyRecord, DataSource, GeometryRef, MarketRecord, RentRecord,
};
use crate::states::{state_key, state_name};
use crate::validation::{validate_rent_table, validate_table};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Months averaged from a ZORI file
pub const DEFAULT_ZORI_WINDOW: usize = 3;

const ZORI_DATE_FORMAT: &str = "%Y-%m-%d";

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let row: T = result.with_context(|| {
            format!("Failed to deserialize row {} of {}", line + 1, path.display())
        })?;
        rows.push(row);
    }

    Ok(rows)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// County id from whichever identifier columns the file carries
///
/// A HUD `fips` value is 10 digits (GEOID + county subdivision); only the
/// first 5 are the county. Without any code the id falls back to
/// "{state key}:{county name}".
fn resolve_id(
    geoid: Option<&str>,
    fips: Option<&str>,
    state: &str,
    county_name: Option<&str>,
) -> CountyId {
    if let Some(geoid) = geoid {
        return CountyId::from_geoid(geoid);
    }

    if let Some(fips) = fips {
        let digits = fips.trim();
        let numeric = digits.chars().all(|c| c.is_ascii_digit());
        if numeric && digits.len() > 10 {
            // HUD fips is at most 10 digits; fall back to the name key
            warn!(fips = digits, "fips longer than 10 digits, using county name");
        } else if numeric && digits.len() > 5 {
            let padded = format!("{:0>10}", digits);
            return CountyId::new(&padded[..5]);
        } else {
            return CountyId::from_geoid(digits);
        }
    }

    CountyId::new(format!(
        "{}:{}",
        state_key(state),
        county_name.map(str::trim).unwrap_or_default()
    ))
}

// ============================================================================
// HUD FAIR MARKET RENTS
// ============================================================================

#[derive(Debug, Deserialize)]
struct FmrRow {
    #[serde(rename = "GEOID", alias = "geoid", default)]
    geoid: Option<String>,
    #[serde(default)]
    fips: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    state_name: Option<String>,
    #[serde(alias = "countyname", default)]
    county_name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    fmr_0: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    fmr_1: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    fmr_2: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    fmr_3: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    fmr_4: Option<f64>,
}

impl FmrRow {
    fn into_record(self) -> RentRecord {
        let county_name = non_blank(self.county_name);
        let state = non_blank(self.state_name)
            .or(non_blank(self.state))
            .unwrap_or_default();
        let id = resolve_id(
            non_blank(self.geoid).as_deref(),
            non_blank(self.fips).as_deref(),
            &state,
            county_name.as_deref(),
        );

        let fmr = [self.fmr_0, self.fmr_1, self.fmr_2, self.fmr_3, self.fmr_4]
            .map(|v| v.filter(|v| v.is_finite() && *v > 0.0));

        RentRecord {
            id,
            county_name,
            state,
            fmr,
            source: DataSource::Hud,
        }
    }
}

/// Load a HUD FMR table
///
/// Rows whose five FMR values are all missing (or zero) are dropped.
pub fn load_hud_fmr(path: &Path) -> Result<Vec<RentRecord>> {
    let rows: Vec<FmrRow> = read_rows(path)?;
    let total = rows.len();

    let records: Vec<RentRecord> = rows
        .into_iter()
        .map(FmrRow::into_record)
        .filter(RentRecord::has_any_fmr)
        .collect();

    let dropped = total - records.len();
    if dropped > 0 {
        debug!(dropped, "dropped counties with no FMR values");
    }

    let check = validate_rent_table("hud_fmr", &records)?;
    info!(
        path = %path.display(),
        rows = records.len(),
        dropped,
        issues = check.issues.len(),
        "loaded HUD FMR table"
    );

    Ok(records)
}

// ============================================================================
// CENSUS ACS
// ============================================================================

#[derive(Debug, Deserialize)]
struct CensusRow {
    #[serde(rename = "GEOID", alias = "geoid", default)]
    geoid: Option<String>,
    #[serde(default)]
    state_fips: Option<String>,
    #[serde(default)]
    county_fips: Option<String>,
    /// "Autauga County, Alabama"
    #[serde(rename = "NAME", default)]
    full_name: Option<String>,
    #[serde(default)]
    county_name: Option<String>,
    #[serde(default)]
    state_name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    median_gross_rent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    median_household_income: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_renter_households_cost: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    rent_30_to_34_9_percent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    rent_35_to_39_9_percent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    rent_40_to_49_9_percent: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    rent_50_percent_or_more: Option<f64>,
}

/// Negative ACS values are annotation sentinels, not data
fn census_value(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

impl CensusRow {
    fn cost_burden(&self) -> Option<CostBurden> {
        Some(CostBurden {
            total_renter_households: census_value(self.total_renter_households_cost)?,
            rent_30_to_34_9_percent: census_value(self.rent_30_to_34_9_percent)?,
            rent_35_to_39_9_percent: census_value(self.rent_35_to_39_9_percent)?,
            rent_40_to_49_9_percent: census_value(self.rent_40_to_49_9_percent)?,
            rent_50_percent_or_more: census_value(self.rent_50_percent_or_more)?,
        })
    }

    fn into_record(self) -> MarketRecord {
        let cost_burden = self.cost_burden();

        let (name_part, state_part) = match non_blank(self.full_name) {
            Some(full) => match full.split_once(',') {
                Some((county, state)) => (Some(county.trim().to_string()), Some(state.trim().to_string())),
                None => (Some(full), None),
            },
            None => (None, None),
        };

        let county_name = non_blank(self.county_name).or(name_part);
        let state_fips = non_blank(self.state_fips);
        let state = non_blank(self.state_name)
            .or(state_part)
            .or_else(|| state_fips.clone())
            .unwrap_or_default();

        let id = match (non_blank(self.geoid), &state_fips, non_blank(self.county_fips)) {
            (Some(geoid), _, _) => CountyId::from_geoid(&geoid),
            (None, Some(state_fips), Some(county_fips)) => CountyId::from_fips(state_fips, &county_fips),
            _ => resolve_id(None, None, &state, county_name.as_deref()),
        };

        MarketRecord {
            id,
            county_name,
            state,
            median_rent: census_value(self.median_gross_rent),
            median_income: census_value(self.median_household_income),
            cost_burden,
            source: DataSource::Census,
        }
    }
}

pub fn load_census(path: &Path) -> Result<Vec<MarketRecord>> {
    let rows: Vec<CensusRow> = read_rows(path)?;
    let records: Vec<MarketRecord> = rows.into_iter().map(CensusRow::into_record).collect();

    validate_table("census", &records)?;

    let missing_income = records.iter().filter(|r| r.median_income.is_none()).count();
    info!(
        path = %path.display(),
        rows = records.len(),
        missing_income,
        "loaded Census ACS table"
    );

    Ok(records)
}

// ============================================================================
// ZILLOW OBSERVED RENT INDEX
// ============================================================================

/// Load a ZORI county table, averaging the last `window` monthly columns
pub fn load_zillow_zori(path: &Path, window: usize) -> Result<Vec<MarketRecord>> {
    if window == 0 {
        return Err(InputError::InvalidConfig("ZORI window must be at least one month".to_string()).into());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let (Some(name_col), Some(state_col)) = (column("RegionName"), column("StateName")) else {
        bail!("{} is missing RegionName or StateName", path.display());
    };
    let state_fips_col = column("StateCodeFIPS");
    let county_fips_col = column("MunicipalCodeFIPS");

    let mut months: Vec<(NaiveDate, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| NaiveDate::parse_from_str(h, ZORI_DATE_FORMAT).ok().map(|d| (d, i)))
        .collect();
    if months.is_empty() {
        bail!("{} has no monthly columns", path.display());
    }
    months.sort();
    let recent: Vec<usize> = months.iter().rev().take(window).map(|(_, i)| *i).collect();

    if let Some((first, _)) = months.iter().rev().take(window).last() {
        debug!(from = %first, months = recent.len(), "ZORI averaging window");
    }

    let mut records = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read row {} of {}", line + 1, path.display()))?;
        let field = |i: usize| row.get(i).map(str::trim).filter(|v| !v.is_empty());

        let county_name = field(name_col).map(str::to_string);
        let state = field(state_col).unwrap_or_default().to_string();

        let id = match (state_fips_col.and_then(field), county_fips_col.and_then(field)) {
            (Some(state_fips), Some(county_fips)) => CountyId::from_fips(state_fips, county_fips),
            _ => resolve_id(None, None, &state, county_name.as_deref()),
        };

        let values: Vec<f64> = recent
            .iter()
            .filter_map(|i| field(*i))
            .filter_map(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        let median_rent = if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        };

        records.push(MarketRecord {
            id,
            county_name,
            state,
            median_rent,
            median_income: None,
            cost_burden: None,
            source: DataSource::Zillow,
        });
    }

    validate_table("zillow_zori", &records)?;

    let without_rent = records.iter().filter(|r| r.median_rent.is_none()).count();
    if without_rent > 0 {
        warn!(without_rent, "ZORI counties with no recent observations");
    }
    info!(path = %path.display(), rows = records.len(), window, "loaded Zillow ZORI table");

    Ok(records)
}

// ============================================================================
// COUNTY GEOID TABLE
// ============================================================================

#[derive(Debug, Deserialize)]
struct CountyRow {
    #[serde(rename = "STATEFP", alias = "state", default)]
    state_fips: Option<String>,
    #[serde(rename = "GEOID", alias = "geoid")]
    geoid: String,
    #[serde(default)]
    county_name: Option<String>,
    #[serde(default)]
    state_name: Option<String>,
    /// Opaque boundary reference (WKT, file key, ...); "0" means absent
    #[serde(default)]
    geometry: Option<String>,
}

impl CountyRow {
    fn into_record(self) -> CountyRecord {
        let id = CountyId::from_geoid(&self.geoid);
        let state_fips = non_blank(self.state_fips)
            .or_else(|| id.state_fips().map(str::to_string))
            .unwrap_or_default();
        let state = non_blank(self.state_name)
            .or_else(|| state_name(&state_fips).map(str::to_string))
            .unwrap_or(state_fips);
        let geometry = non_blank(self.geometry)
            .filter(|g| g.trim() != "0")
            .map(GeometryRef::new);

        CountyRecord {
            id,
            county_name: non_blank(self.county_name),
            state_name: state,
            geometry,
        }
    }
}

pub fn load_county_geoids(path: &Path) -> Result<Vec<CountyRecord>> {
    let rows: Vec<CountyRow> = read_rows(path)?;
    let records: Vec<CountyRecord> = rows.into_iter().map(CountyRow::into_record).collect();

    validate_table("county_geoid", &records)?;

    let with_geometry = records.iter().filter(|r| r.geometry.is_some()).count();
    info!(path = %path.display(), rows = records.len(), with_geometry, "loaded county GEOID table");

    Ok(records)
}

// ============================================================================
// MINIMUM WAGE TABLE
// ============================================================================

#[derive(Debug, Deserialize)]
struct MinimumWageRow {
    #[serde(alias = "state", default)]
    state_fips: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    min_wage: Option<f64>,
}

/// Hourly minimum wage by state, keyed by 2-digit FIPS
///
/// Feeds `AggregatorConfig::minimum_wages`. Rows without a positive wage
/// are skipped.
pub fn load_minimum_wages(path: &Path) -> Result<BTreeMap<String, f64>> {
    let rows: Vec<MinimumWageRow> = read_rows(path)?;
    let total = rows.len();

    let wages: BTreeMap<String, f64> = rows
        .into_iter()
        .filter_map(|row| {
            let state = non_blank(row.state_fips)?;
            let wage = row.min_wage.filter(|w| w.is_finite() && *w > 0.0)?;
            Some((state_key(&state), wage))
        })
        .collect();

    if wages.is_empty() {
        return Err(InputError::empty("minimum_wage").into());
    }
    info!(path = %path.display(), states = wages.len(), skipped = total - wages.len(), "loaded minimum wages");

    Ok(wages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::BedroomType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_hud_fmr_state_and_county_name() {
        let file = csv_file(
            "state,countyname,fmr_0,fmr_1,fmr_2,fmr_3,fmr_4\n\
             29,St. Louis County,900,1000,1200,1500,1700\n\
             29,Ghost County,0,0,0,0,0\n\
             2,Juneau City and Borough,1100,1250,,1900,2100\n",
        );

        let records = load_hud_fmr(file.path()).unwrap();
        assert_eq!(records.len(), 2, "all-zero FMR row must be dropped");

        let st_louis = &records[0];
        assert_eq!(st_louis.id.as_str(), "29:St. Louis County");
        assert_eq!(st_louis.fmr(BedroomType::TwoBedroom), Some(1200.0));

        let juneau = &records[1];
        assert_eq!(juneau.state, "2");
        assert_eq!(juneau.fmr(BedroomType::TwoBedroom), None);
        assert_eq!(juneau.id.as_str(), "02:Juneau City and Borough");
    }

    #[test]
    fn test_hud_fmr_geoid_is_zero_padded() {
        let file = csv_file(
            "GEOID,county_name,state_name,fmr_0,fmr_1,fmr_2,fmr_3,fmr_4\n\
             6037,Los Angeles,California,1800,2000,2500,3200,3500\n",
        );

        let records = load_hud_fmr(file.path()).unwrap();
        assert_eq!(records[0].id.as_str(), "06037");
        assert_eq!(records[0].state, "California");
    }

    #[test]
    fn test_hud_fmr_ten_digit_fips() {
        let file = csv_file(
            "fips,state,countyname,fmr_0,fmr_1,fmr_2,fmr_3,fmr_4\n\
             100199999,1,Autauga County,800,850,1000,1300,1500\n",
        );

        let records = load_hud_fmr(file.path()).unwrap();
        assert_eq!(records[0].id.as_str(), "01001");
    }

    #[test]
    fn test_hud_fmr_overlong_fips_uses_name() {
        let file = csv_file(
            "fips,state,countyname,fmr_0,fmr_1,fmr_2,fmr_3,fmr_4\n\
             123456789012,29,St. Louis County,900,1000,1200,1500,1700\n",
        );

        let records = load_hud_fmr(file.path()).unwrap();
        assert_eq!(records[0].id.as_str(), "29:St. Louis County");
    }

    #[test]
    fn test_census_sentinels_become_missing() {
        let file = csv_file(
            "GEOID,NAME,median_gross_rent,median_household_income,total_renter_households_cost,\
             rent_30_to_34_9_percent,rent_35_to_39_9_percent,rent_40_to_49_9_percent,rent_50_percent_or_more\n\
             1001,\"Autauga County, Alabama\",1050,68315,6000,500,400,600,1300\n\
             2013,\"Aleutians East Borough, Alaska\",-666666666,-666666666,,,,,\n",
        );

        let records = load_census(file.path()).unwrap();
        assert_eq!(records.len(), 2);

        let autauga = &records[0];
        assert_eq!(autauga.id.as_str(), "01001");
        assert_eq!(autauga.county_name.as_deref(), Some("Autauga County"));
        assert_eq!(autauga.state, "Alabama");
        assert_eq!(autauga.median_income, Some(68315.0));
        assert_eq!(autauga.cost_burden.and_then(|b| b.cost_burdened_share()), Some(2800.0 / 6000.0));

        let aleutians = &records[1];
        assert_eq!(aleutians.median_rent, None);
        assert_eq!(aleutians.median_income, None);
        assert_eq!(aleutians.cost_burden, None);
    }

    #[test]
    fn test_census_state_and_county_fips() {
        let file = csv_file(
            "state_fips,county_fips,county_name,state_name,median_gross_rent,median_household_income\n\
             6,37,Los Angeles County,California,1900,83411\n",
        );

        let records = load_census(file.path()).unwrap();
        assert_eq!(records[0].id.as_str(), "06037");
    }

    #[test]
    fn test_zillow_moving_average_uses_latest_months() {
        let file = csv_file(
            "RegionID,RegionName,StateName,StateCodeFIPS,MunicipalCodeFIPS,2024-09-30,2024-10-31,2024-11-30,2024-12-31\n\
             1,Los Angeles County,CA,6,37,100,2900,3000,3100\n\
             2,Cook County,IL,17,31,1800,1850,,1950\n\
             3,Loving County,TX,48,301,,,,\n",
        );

        let records = load_zillow_zori(file.path(), DEFAULT_ZORI_WINDOW).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].id.as_str(), "06037");
        assert_eq!(records[0].median_rent, Some(3000.0));
        assert_eq!(records[0].source, DataSource::Zillow);
        assert_eq!(records[1].median_rent, Some(1900.0));
        assert_eq!(records[2].median_rent, None);
    }

    #[test]
    fn test_zillow_requires_month_columns() {
        let file = csv_file("RegionName,StateName\nCook County,IL\n");
        assert!(load_zillow_zori(file.path(), 3).is_err());
        assert!(load_zillow_zori(file.path(), 0).is_err());
    }

    #[test]
    fn test_county_geoids() {
        let file = csv_file(
            "STATEFP,GEOID,county_name,geometry\n\
             29,29510,ST. LOUIS CITY,POLYGON((0 0))\n\
             2,2110,JUNEAU COUNTY,0\n",
        );

        let records = load_county_geoids(file.path()).unwrap();
        assert_eq!(records[0].state_name, "Missouri");
        assert!(records[0].geometry.is_some());
        assert_eq!(records[1].id.as_str(), "02110");
        assert_eq!(records[1].state_name, "Alaska");
        assert!(records[1].geometry.is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected_at_load() {
        let file = csv_file(
            "GEOID,county_name,state_name,fmr_0,fmr_1,fmr_2,fmr_3,fmr_4\n\
             29510,St. Louis city,Missouri,900,1000,1200,1500,1700\n\
             29510,St. Louis city,Missouri,900,1000,1200,1500,1700\n",
        );

        let err = load_hud_fmr(file.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::DuplicateCountyId { .. })
        ));
    }

    #[test]
    fn test_empty_table_rejected() {
        let file = csv_file("GEOID,NAME,median_gross_rent,median_household_income\n");
        let err = load_census(file.path()).unwrap_err();
        assert_eq!(err.downcast_ref::<InputError>(), Some(&InputError::empty("census")));
    }

    #[test]
    fn test_minimum_wages() {
        let file = csv_file("state_fips,min_wage\n29,13.75\n6,16.50\n48,\n");
        let wages = load_minimum_wages(file.path()).unwrap();

        assert_eq!(wages.len(), 2);
        assert_eq!(wages["29"], 13.75);
        assert_eq!(wages["06"], 16.5);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_hud_fmr(Path::new("/nonexistent/FY25_FMRs.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to open CSV file"));
    }
}
