// 📈 Aggregator - per-bedroom statistics and derived metrics
//
// Recomputed from its inputs on every call; nothing is memoized here.
// Values are filtered to non-null before any statistic is taken.

use crate::config::AggregatorConfig;
use crate::metrics::{DerivedMetrics, Metric};
use crate::records::{BedroomType, CountyId, CountyNamed, MatchedRecord, RentRecord};
use crate::states::state_key;
use crate::stats::{summarize, CountyValue, StatsOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

// ============================================================================
// QUERY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsQuery {
    pub bedroom: BedroomType,
    pub metric: Metric,

    /// Restrict to one state (FIPS, USPS code or name)
    pub state: Option<String>,
}

impl StatsQuery {
    pub fn new(bedroom: BedroomType, metric: Metric) -> Self {
        StatsQuery {
            bedroom,
            metric,
            state: None,
        }
    }

    pub fn for_state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    fn includes(&self, state: &str) -> bool {
        match &self.state {
            Some(wanted) => state_key(wanted) == state_key(state),
            None => true,
        }
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    pub config: AggregatorConfig,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AggregatorConfig) -> Self {
        Aggregator { config }
    }

    /// FMR statistics straight from HUD records, no market data needed
    pub fn summarize_rents(
        &self,
        records: &[RentRecord],
        bedroom: BedroomType,
        state: Option<&str>,
    ) -> StatsOutcome {
        let mut query = StatsQuery::new(bedroom, Metric::Fmr);
        if let Some(state) = state {
            query = query.for_state(state);
        }

        let rows = records.iter().filter(|r| query.includes(&r.state));
        let (observations, excluded) =
            collect(rows, |r| r.fmr(bedroom).map(|v| attribute(r, v)));

        debug!(
            bedroom = bedroom.count(),
            counted = observations.len(),
            excluded,
            "summarizing FMR"
        );
        summarize(bedroom, Metric::Fmr, observations, excluded)
    }

    /// Statistics for any metric over matched records
    pub fn summarize(&self, records: &[MatchedRecord], query: &StatsQuery) -> StatsOutcome {
        let rows = records.iter().filter(|r| query.includes(&r.state));
        let (observations, excluded) = collect(rows, |r| {
            DerivedMetrics::compute(r, query.bedroom, &self.config)
                .value(query.metric)
                .map(|v| CountyValue {
                    value: v,
                    county_id: r.id.clone(),
                    county_name: r.county_name.clone(),
                    state: r.state.clone(),
                })
        });

        let outcome = summarize(query.bedroom, query.metric, observations, excluded);
        info!(
            metric = %query.metric,
            bedroom = query.bedroom.count(),
            state = query.state.as_deref().unwrap_or("all"),
            empty = outcome.is_empty(),
            "computed statistics"
        );
        outcome
    }

    /// One outcome per bedroom count, studio first
    pub fn summarize_all_bedrooms(
        &self,
        records: &[MatchedRecord],
        metric: Metric,
        state: Option<&str>,
    ) -> Vec<StatsOutcome> {
        BedroomType::ALL
            .iter()
            .map(|bedroom| {
                let mut query = StatsQuery::new(*bedroom, metric);
                if let Some(state) = state {
                    query = query.for_state(state);
                }
                self.summarize(records, &query)
            })
            .collect()
    }

    /// Derived metrics keyed by county, for records with both FMR and
    /// median income present
    pub fn derived_metrics(
        &self,
        records: &[MatchedRecord],
        bedroom: BedroomType,
    ) -> BTreeMap<CountyId, DerivedMetrics> {
        let derived: BTreeMap<CountyId, DerivedMetrics> = records
            .iter()
            .filter(|r| r.fmr(bedroom).is_some() && r.market.median_income.is_some())
            .map(|r| (r.id.clone(), DerivedMetrics::compute(r, bedroom, &self.config)))
            .collect();

        debug!(
            bedroom = bedroom.count(),
            counties = derived.len(),
            skipped = records.len() - derived.len(),
            "derived metrics"
        );
        derived
    }
}

fn attribute<T: CountyNamed>(record: &T, value: f64) -> CountyValue {
    CountyValue {
        value,
        county_id: record.county_id().clone(),
        county_name: record.county_name().unwrap_or_default().to_string(),
        state: record.state().to_string(),
    }
}

/// Split rows into attributed values and a count of rows with no value
fn collect<'a, T: 'a>(
    rows: impl Iterator<Item = &'a T>,
    value_of: impl Fn(&T) -> Option<CountyValue>,
) -> (Vec<CountyValue>, usize) {
    let mut observations = Vec::new();
    let mut excluded = 0;
    for row in rows {
        match value_of(row) {
            Some(observation) => observations.push(observation),
            None => excluded += 1,
        }
    }
    (observations, excluded)
}
