// 📋 Records - fixed-shape county, rent and market rows
//
// Every source table is loaded into one of these shapes before matching.
// Missing values are Option::None; nothing is zero-imputed.

use crate::error::InputError;
use crate::matcher::MatchStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// COUNTY IDENTIFIER
// ============================================================================

/// County identifier: 5-digit GEOID (state FIPS + county FIPS) when known,
/// otherwise a name string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountyId(String);

impl CountyId {
    pub fn new(id: impl Into<String>) -> Self {
        CountyId(id.into())
    }

    /// Build a GEOID from separate state and county FIPS codes
    ///
    /// Example: `from_fips("6", "37")` → `"06037"`
    pub fn from_fips(state_fips: &str, county_fips: &str) -> Self {
        CountyId(format!(
            "{:0>2}{:0>3}",
            state_fips.trim(),
            county_fips.trim()
        ))
    }

    /// Normalize a raw GEOID column value. Numeric ids lose their leading
    /// zero when a spreadsheet touches them, so they are padded back to 5.
    pub fn from_geoid(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            CountyId(format!("{:0>5}", trimmed))
        } else {
            CountyId(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// State FIPS prefix, when this id is a GEOID
    pub fn state_fips(&self) -> Option<&str> {
        if self.0.len() == 5 && self.0.chars().all(|c| c.is_ascii_digit()) {
            Some(&self.0[..2])
        } else {
            None
        }
    }
}

impl fmt::Display for CountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// BEDROOM SELECTOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BedroomType {
    Studio,
    OneBedroom,
    TwoBedroom,
    ThreeBedroom,
    FourBedroom,
}

impl BedroomType {
    pub const ALL: [BedroomType; 5] = [
        BedroomType::Studio,
        BedroomType::OneBedroom,
        BedroomType::TwoBedroom,
        BedroomType::ThreeBedroom,
        BedroomType::FourBedroom,
    ];

    pub fn from_count(count: u8) -> Result<Self, InputError> {
        match count {
            0 => Ok(BedroomType::Studio),
            1 => Ok(BedroomType::OneBedroom),
            2 => Ok(BedroomType::TwoBedroom),
            3 => Ok(BedroomType::ThreeBedroom),
            4 => Ok(BedroomType::FourBedroom),
            other => Err(InputError::InvalidBedroom(other.to_string())),
        }
    }

    pub fn count(&self) -> u8 {
        match self {
            BedroomType::Studio => 0,
            BedroomType::OneBedroom => 1,
            BedroomType::TwoBedroom => 2,
            BedroomType::ThreeBedroom => 3,
            BedroomType::FourBedroom => 4,
        }
    }

    pub fn index(&self) -> usize {
        self.count() as usize
    }

    /// Dashboard label, e.g. "2-Bedroom"
    pub fn label(&self) -> String {
        format!("{}-Bedroom", self.count())
    }
}

impl FromStr for BedroomType {
    type Err = InputError;

    /// Accepts "2", "2-Bedroom", "2 Bedroom", "fmr_2", "studio", "efficiency"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();

        if lower == "studio" || lower == "efficiency" {
            return Ok(BedroomType::Studio);
        }

        let digits = lower.strip_prefix("fmr_").unwrap_or(&lower);
        let head: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
        let rest = digits[head.len()..].trim_start_matches(['-', ' ', '_']);

        if head.is_empty() || !(rest.is_empty() || rest.starts_with("bedroom") || rest == "br") {
            return Err(InputError::InvalidBedroom(s.to_string()));
        }

        head.parse::<u8>()
            .map_err(|_| InputError::InvalidBedroom(s.to_string()))
            .and_then(BedroomType::from_count)
    }
}

impl fmt::Display for BedroomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ============================================================================
// SOURCE RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// HUD Fair Market Rents
    Hud,
    /// Zillow Observed Rent Index
    Zillow,
    /// Census ACS 5-year estimates
    Census,
}

/// Opaque handle to a county boundary. Only the loader interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryRef(String);

impl GeometryRef {
    pub fn new(reference: impl Into<String>) -> Self {
        GeometryRef(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyRecord {
    pub id: CountyId,
    pub county_name: Option<String>,
    pub state_name: String,
    pub geometry: Option<GeometryRef>,
}

/// HUD Fair Market Rents for one county
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentRecord {
    pub id: CountyId,
    pub county_name: Option<String>,
    pub state: String,
    /// FMR indexed by bedroom count 0..=4
    pub fmr: [Option<f64>; 5],
    pub source: DataSource,
}

impl RentRecord {
    pub fn new(id: CountyId, county_name: &str, state: &str, fmr: [Option<f64>; 5]) -> Self {
        RentRecord {
            id,
            county_name: Some(county_name.to_string()),
            state: state.to_string(),
            fmr,
            source: DataSource::Hud,
        }
    }

    pub fn fmr(&self, bedroom: BedroomType) -> Option<f64> {
        self.fmr[bedroom.index()]
    }

    pub fn has_any_fmr(&self) -> bool {
        self.fmr.iter().any(Option::is_some)
    }
}

/// Renter households by share of income spent on rent (ACS B25070)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBurden {
    pub total_renter_households: f64,
    pub rent_30_to_34_9_percent: f64,
    pub rent_35_to_39_9_percent: f64,
    pub rent_40_to_49_9_percent: f64,
    pub rent_50_percent_or_more: f64,
}

impl CostBurden {
    /// Share of renters spending more than 30% of income (0.0-1.0)
    pub fn cost_burdened_share(&self) -> Option<f64> {
        if self.total_renter_households <= 0.0 {
            return None;
        }
        let burdened = self.rent_30_to_34_9_percent
            + self.rent_35_to_39_9_percent
            + self.rent_40_to_49_9_percent
            + self.rent_50_percent_or_more;
        Some(burdened / self.total_renter_households)
    }

    /// Share of renters spending 50% or more of income (0.0-1.0)
    pub fn severe_cost_burdened_share(&self) -> Option<f64> {
        if self.total_renter_households <= 0.0 {
            return None;
        }
        Some(self.rent_50_percent_or_more / self.total_renter_households)
    }
}

/// Market rent and income for one county (Zillow or Census)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: CountyId,
    pub county_name: Option<String>,
    pub state: String,
    pub median_rent: Option<f64>,
    pub median_income: Option<f64>,
    pub cost_burden: Option<CostBurden>,
    pub source: DataSource,
}

impl MarketRecord {
    pub fn new(
        id: CountyId,
        county_name: &str,
        state: &str,
        median_rent: Option<f64>,
        median_income: Option<f64>,
    ) -> Self {
        MarketRecord {
            id,
            county_name: Some(county_name.to_string()),
            state: state.to_string(),
            median_rent,
            median_income,
            cost_burden: None,
            source: DataSource::Census,
        }
    }
}

/// A rent record reconciled with a market record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRecord {
    /// Identifier of the rent (left) side
    pub id: CountyId,
    pub county_name: String,
    pub state: String,
    pub rent: RentRecord,
    pub market: MarketRecord,
    /// 100 for exact matches, the similarity score for fuzzy ones
    pub confidence: u8,
    pub strategy: MatchStrategy,
}

impl MatchedRecord {
    pub fn fmr(&self, bedroom: BedroomType) -> Option<f64> {
        self.rent.fmr(bedroom)
    }
}

// ============================================================================
// MATCHABLE
// ============================================================================

/// Anything the matcher can reconcile: an id, a (nullable) county name and a state
pub trait CountyNamed {
    fn county_id(&self) -> &CountyId;
    fn county_name(&self) -> Option<&str>;
    fn state(&self) -> &str;
}

impl CountyNamed for CountyRecord {
    fn county_id(&self) -> &CountyId {
        &self.id
    }
    fn county_name(&self) -> Option<&str> {
        self.county_name.as_deref()
    }
    fn state(&self) -> &str {
        &self.state_name
    }
}

impl CountyNamed for RentRecord {
    fn county_id(&self) -> &CountyId {
        &self.id
    }
    fn county_name(&self) -> Option<&str> {
        self.county_name.as_deref()
    }
    fn state(&self) -> &str {
        &self.state
    }
}

impl CountyNamed for MarketRecord {
    fn county_id(&self) -> &CountyId {
        &self.id
    }
    fn county_name(&self) -> Option<&str> {
        self.county_name.as_deref()
    }
    fn state(&self) -> &str {
        &self.state
    }
}
