// FMR Atlas - Core Library
// Joins HUD Fair Market Rents with Zillow/Census market data by county and
// computes the statistics and affordability metrics behind the FMR map.

pub mod error;
pub mod states;
pub mod records;
pub mod similarity;
pub mod validation;  // Shape checks at the loader/matcher boundary
pub mod matcher;     // Exact + fuzzy county reconciliation
pub mod stats;
pub mod metrics;
pub mod aggregator;
pub mod config;
pub mod loader;
pub mod cache;
pub mod pipeline;

// Re-export commonly used types
pub use error::{InputError, Result};
pub use records::{
    BedroomType, CostBurden, CountyId, CountyNamed, CountyRecord, DataSource,
    GeometryRef, MarketRecord, MatchedRecord, RentRecord,
};
pub use similarity::{normalize_county_name, token_sort_ratio};
pub use validation::{validate_rent_table, validate_table, IssueKind, TableCheck, TableIssue};
pub use matcher::{
    CountyMatch, CountyMatcher, MatchReport, MatchStrategy, UnmatchedRecord,
    DEFAULT_FUZZY_THRESHOLD,
};
pub use stats::{CountyValue, Quartiles, StatsOutcome, StatsSummary};
pub use metrics::{DerivedMetrics, Metric, ValueFormat};
pub use aggregator::{Aggregator, StatsQuery};
pub use config::{AggregatorConfig, Config, MatcherConfig};
pub use loader::{
    load_census, load_county_geoids, load_hud_fmr, load_minimum_wages, load_zillow_zori,
    DEFAULT_ZORI_WINDOW,
};
pub use cache::{CacheStats, TableCache};
pub use pipeline::{AnalysisReport, Pipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
