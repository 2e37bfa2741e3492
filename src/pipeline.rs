// 🧭 Pipeline - match, join, summarize and derive in one call
//
// Rents are the left side throughout. When a county GEOID table is given,
// rent records keyed by "{state}:{name}" are first re-keyed to the GEOID of
// the county they match.

use crate::aggregator::{Aggregator, StatsQuery};
use crate::config::Config;
use crate::error::Result;
use crate::matcher::{CountyMatcher, MatchReport, UnmatchedRecord};
use crate::metrics::{DerivedMetrics, Metric};
use crate::records::{BedroomType, CountyId, CountyRecord, MarketRecord, MatchedRecord, RentRecord};
use crate::stats::StatsOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub bedroom: BedroomType,
    pub generated_at: DateTime<Utc>,

    /// Rent → county GEOID resolution, when a county table was supplied
    pub geoid_report: Option<MatchReport>,

    /// Rent → market reconciliation
    pub match_report: MatchReport,

    pub matched: Vec<MatchedRecord>,

    /// One outcome per metric, in `Metric::ALL` order
    pub statistics: Vec<(Metric, StatsOutcome)>,

    /// Counties with both FMR and income for the bedroom
    pub derived: BTreeMap<CountyId, DerivedMetrics>,
}

impl AnalysisReport {
    pub fn outcome(&self, metric: Metric) -> Option<&StatsOutcome> {
        self.statistics
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, outcome)| outcome)
    }

    pub fn summary(&self) -> String {
        let summarized = self.statistics.iter().filter(|(_, o)| !o.is_empty()).count();
        format!(
            "{} | {}: {} matched counties, {} metrics summarized, {} with derived metrics",
            self.match_report.summary(),
            self.bedroom,
            self.matched.len(),
            summarized,
            self.derived.len()
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub matcher: CountyMatcher,
    pub aggregator: Aggregator,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Pipeline {
            matcher: config.matcher.build(),
            aggregator: Aggregator::with_config(config.aggregator.clone()),
        }
    }

    /// Re-key rent records to the GEOID of their matched county
    ///
    /// Unmatched rents keep their original id. A county claimed by several
    /// rents goes to the most confident claimant, the earliest rent on ties;
    /// the others are moved to `unmatched` so GEOIDs stay unique.
    pub fn resolve_county_ids(
        &self,
        rents: &[RentRecord],
        counties: &[CountyRecord],
    ) -> Result<(Vec<RentRecord>, MatchReport)> {
        let mut report = self.matcher.match_records(rents, counties)?;

        let mut claims = std::mem::take(&mut report.matches);
        claims.sort_by_key(|m| (m.right_index, Reverse(m.confidence), m.left_index));

        let mut claimed = HashSet::new();
        for m in claims {
            if claimed.insert(m.right_index) {
                report.matches.push(m);
                continue;
            }

            let rent = &rents[m.left_index];
            warn!(
                rent = %rent.id,
                county = %m.right_id,
                confidence = m.confidence,
                "county already claimed by another rent, leaving id unchanged"
            );
            report.unmatched.push(UnmatchedRecord {
                left_index: m.left_index,
                county_id: rent.id.clone(),
                county_name: rent.county_name.clone().unwrap_or_default(),
                state: rent.state.clone(),
                best_candidate: counties[m.right_index].county_name.clone(),
                best_score: Some(m.confidence),
            });
        }
        report.matches.sort_by_key(|m| m.left_index);
        report.unmatched.sort_by_key(|u| u.left_index);

        let resolved = rents
            .iter()
            .enumerate()
            .map(|(index, rent)| {
                let mut rent = rent.clone();
                if let Some(m) = report.match_for(index) {
                    rent.id = counties[m.right_index].id.clone();
                }
                rent
            })
            .collect();

        Ok((resolved, report))
    }

    pub fn run(
        &self,
        rents: &[RentRecord],
        markets: &[MarketRecord],
        counties: Option<&[CountyRecord]>,
        bedroom: BedroomType,
    ) -> Result<AnalysisReport> {
        let (rents, geoid_report) = match counties {
            Some(counties) => {
                let (resolved, report) = self.resolve_county_ids(rents, counties)?;
                (resolved, Some(report))
            }
            None => (rents.to_vec(), None),
        };

        let (matched, match_report) = self.matcher.join(&rents, markets)?;

        let statistics = Metric::ALL
            .iter()
            .map(|metric| {
                let query = StatsQuery::new(bedroom, *metric);
                (*metric, self.aggregator.summarize(&matched, &query))
            })
            .collect();
        let derived = self.aggregator.derived_metrics(&matched, bedroom);

        let report = AnalysisReport {
            bedroom,
            generated_at: Utc::now(),
            geoid_report,
            match_report,
            matched,
            statistics,
            derived,
        };
        info!(summary = %report.summary(), "analysis complete");

        Ok(report)
    }
}
