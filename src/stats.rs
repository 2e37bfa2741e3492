// 📊 Descriptive statistics over county values
//
// All functions take values that already passed the non-null filter.
// An empty input never produces NaN: summarize() returns StatsOutcome::Empty.

use crate::metrics::Metric;
use crate::records::{BedroomType, CountyId};
use serde::{Deserialize, Serialize};

/// Arithmetic mean; None for empty input
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N) given a pre-computed mean
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile of sorted values with linear interpolation between ranks
///
/// `p` in 0.0..=1.0. Rank `h = (n - 1) × p`; the result interpolates between
/// the values at `floor(h)` and `ceil(h)`.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lower = h.floor() as usize;
    let upper = h.ceil() as usize;
    let fraction = h - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Median, defined as the 50th percentile above
pub fn median(sorted: &[f64]) -> Option<f64> {
    percentile(sorted, 0.5)
}

// ============================================================================
// SUMMARY TYPES
// ============================================================================

/// A value attributed to the county it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyValue {
    pub value: f64,
    pub county_id: CountyId,
    pub county_name: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub bedroom: BedroomType,
    pub metric: Metric,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: CountyValue,
    pub max: CountyValue,
    pub std_dev: f64,
    pub quartiles: Quartiles,
    /// Records dropped by the non-null filter
    pub excluded: usize,
}

impl StatsSummary {
    /// (statistic, formatted value) rows as the dashboard shows them
    pub fn rows(&self) -> Vec<(String, String)> {
        let fmt = |v: f64| self.metric.format_value(v);
        let attributed = |cv: &CountyValue| {
            format!("{} ({}, {})", fmt(cv.value), cv.county_name, cv.state)
        };

        vec![
            ("Mean".to_string(), fmt(self.mean)),
            ("Median".to_string(), fmt(self.median)),
            ("Minimum".to_string(), attributed(&self.min)),
            ("Maximum".to_string(), attributed(&self.max)),
            ("Counties".to_string(), self.count.to_string()),
            ("Std Dev".to_string(), fmt(self.std_dev)),
            ("Q1 (25th)".to_string(), fmt(self.quartiles.q1)),
            ("Q3 (75th)".to_string(), fmt(self.quartiles.q3)),
        ]
    }
}

/// Result of a statistics request. Empty is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatsOutcome {
    Summary(StatsSummary),

    /// Nothing passed the non-null filter
    Empty {
        bedroom: BedroomType,
        metric: Metric,
        excluded: usize,
    },
}

impl StatsOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, StatsOutcome::Empty { .. })
    }

    pub fn summary(&self) -> Option<&StatsSummary> {
        match self {
            StatsOutcome::Summary(summary) => Some(summary),
            StatsOutcome::Empty { .. } => None,
        }
    }

    pub fn into_summary(self) -> Option<StatsSummary> {
        match self {
            StatsOutcome::Summary(summary) => Some(summary),
            StatsOutcome::Empty { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Summarize attributed values
///
/// Non-finite values are treated as missing and counted in `excluded`.
/// Min/max ties keep the first value in input order.
pub fn summarize(
    bedroom: BedroomType,
    metric: Metric,
    observations: Vec<CountyValue>,
    excluded: usize,
) -> StatsOutcome {
    let total = observations.len();
    let observations: Vec<CountyValue> = observations
        .into_iter()
        .filter(|o| o.value.is_finite())
        .collect();
    let excluded = excluded + (total - observations.len());

    let mut iter = observations.iter();
    let Some(first) = iter.next() else {
        return StatsOutcome::Empty {
            bedroom,
            metric,
            excluded,
        };
    };

    let (mut min, mut max) = (first, first);
    for o in iter {
        if o.value < min.value {
            min = o;
        }
        if o.value > max.value {
            max = o;
        }
    }

    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);

    // values is non-empty here, so mean and percentiles are Some.
    // Summation rounding can push the mean of equal values past them.
    let mean_value = mean(&values)
        .unwrap_or_default()
        .clamp(min.value, max.value);
    let q1 = percentile(&sorted, 0.25).unwrap_or_default();
    let q2 = percentile(&sorted, 0.5).unwrap_or_default();
    let q3 = percentile(&sorted, 0.75).unwrap_or_default();

    StatsOutcome::Summary(StatsSummary {
        bedroom,
        metric,
        count: values.len(),
        mean: mean_value,
        median: q2,
        min: min.clone(),
        max: max.clone(),
        std_dev: population_std_dev(&values, mean_value),
        quartiles: Quartiles { q1, q2, q3 },
        excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cv(value: f64, name: &str) -> CountyValue {
        CountyValue {
            value,
            county_id: CountyId::new(name),
            county_name: name.to_string(),
            state: "MO".to_string(),
        }
    }

    #[test]
    fn test_mean_and_std_dev() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1000.0, 1500.0, 2000.0]), Some(1500.0));
        assert_eq!(population_std_dev(&[5.0], 5.0), 0.0);
        assert_eq!(population_std_dev(&[], 0.0), 0.0);
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.25), Some(1.75));
        assert_eq!(percentile(&sorted, 0.5), Some(2.5));
        assert_eq!(percentile(&sorted, 0.75), Some(3.25));
        assert_eq!(percentile(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile(&sorted, 1.0), Some(4.0));
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(median(&[7.0]), Some(7.0));
    }

    #[test]
    fn test_three_county_fmr_scenario() {
        let outcome = summarize(
            BedroomType::TwoBedroom,
            Metric::Fmr,
            vec![cv(1000.0, "A"), cv(1500.0, "B"), cv(2000.0, "C")],
            0,
        );

        let summary = outcome.summary().expect("summary");
        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean, 1500.0);
        assert_eq!(summary.median, 1500.0);
        assert_eq!(summary.min.value, 1000.0);
        assert_eq!(summary.min.county_name, "A");
        assert_eq!(summary.max.value, 2000.0);
        assert_eq!(summary.max.county_name, "C");
        assert!((summary.std_dev - 408.248).abs() < 0.01);
        assert_eq!(summary.quartiles.q1, 1250.0);
        assert_eq!(summary.quartiles.q3, 1750.0);
    }

    #[test]
    fn test_ties_keep_first_encountered() {
        let outcome = summarize(
            BedroomType::Studio,
            Metric::Fmr,
            vec![cv(900.0, "First"), cv(900.0, "Second"), cv(1200.0, "Top"), cv(1200.0, "Later")],
            0,
        );
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.min.county_name, "First");
        assert_eq!(summary.max.county_name, "Top");
    }

    #[test]
    fn test_empty_is_data() {
        let outcome = summarize(BedroomType::FourBedroom, Metric::HousingWage, vec![], 4);
        assert!(outcome.is_empty());
        assert_eq!(
            outcome,
            StatsOutcome::Empty {
                bedroom: BedroomType::FourBedroom,
                metric: Metric::HousingWage,
                excluded: 4,
            }
        );
        assert!(outcome.summary().is_none());
    }

    #[test]
    fn test_non_finite_values_are_excluded() {
        let outcome = summarize(
            BedroomType::Studio,
            Metric::Fmr,
            vec![cv(f64::NAN, "X"), cv(800.0, "Y"), cv(f64::INFINITY, "Z")],
            1,
        );
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.excluded, 3);
        assert_eq!(summary.mean, 800.0);
    }

    #[test]
    fn test_invariants_hold_on_uneven_data() {
        let values = [312.0, 1875.5, 640.0, 640.0, 2210.25, 980.0, 1430.0];
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, v)| cv(*v, &format!("C{}", i)))
            .collect();

        let summary = summarize(BedroomType::OneBedroom, Metric::Fmr, observations, 0)
            .into_summary()
            .unwrap();

        assert!(summary.min.value <= summary.mean && summary.mean <= summary.max.value);
        assert!(summary.std_dev >= 0.0);
        assert_eq!(summary.quartiles.q2, summary.median);
        assert!(summary.quartiles.q1 <= summary.quartiles.q2);
        assert!(summary.quartiles.q2 <= summary.quartiles.q3);
    }

    #[test]
    fn test_mean_of_equal_values_stays_within_range() {
        let outcome = summarize(
            BedroomType::TwoBedroom,
            Metric::Fmr,
            vec![cv(0.1, "A"), cv(0.1, "B"), cv(0.1, "C")],
            0,
        );
        let summary = outcome.summary().unwrap();

        assert!(summary.min.value <= summary.mean && summary.mean <= summary.max.value);
        assert_eq!(summary.mean, 0.1);
        assert!(summary.std_dev >= 0.0);
    }

    #[test]
    fn test_rows_formatting() {
        let summary = summarize(
            BedroomType::TwoBedroom,
            Metric::Fmr,
            vec![cv(1000.0, "A"), cv(2000.0, "C")],
            0,
        )
        .into_summary()
        .unwrap();

        let rows = summary.rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], ("Mean".to_string(), "$1500.00".to_string()));
        assert_eq!(rows[2].1, "$1000.00 (A, MO)");
        assert_eq!(rows[4].1, "2");
    }

    #[test]
    fn test_outcome_serializes() {
        let outcome = summarize(BedroomType::Studio, Metric::Fmr, vec![], 0);
        let json = outcome.to_json().unwrap();
        assert!(json.contains("Empty"));
    }
}
