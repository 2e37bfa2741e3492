// 📐 Metrics - catalogue of map metrics and per-county derived values
//
// Ratios are stored as fractions (0.25, not 25.0) and only scaled for display.

use crate::config::AggregatorConfig;
use crate::error::InputError;
use crate::records::{BedroomType, MatchedRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueFormat {
    /// "$1234.00"
    Dollars,
    /// fraction shown as "25.0%"
    Percent,
    /// "$28.85/hr"
    HourlyDollars,
}

impl ValueFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            ValueFormat::Dollars => format!("${:.2}", value),
            ValueFormat::Percent => format!("{:.1}%", value * 100.0),
            ValueFormat::HourlyDollars => format!("${:.2}/hr", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// HUD Fair Market Rent
    Fmr,
    /// Annual FMR over median household income
    RentToIncomeRatio,
    /// FMR minus median market rent
    AffordabilityGap,
    /// (FMR - median rent) / median rent
    FmrDeviation,
    /// Annual FMR above the affordable share of income, positive only
    IncomeGap,
    /// FMR over median market rent
    VoucherFeasibility,
    /// Renters spending more than 30% of income on rent
    CostBurden,
    /// Renters spending 50% or more of income on rent
    SevereCostBurden,
    /// Hourly wage needed to pay FMR working full time
    HousingWage,
    /// Housing wage over the state minimum wage
    HousingWageToMinimumWage,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Fmr,
        Metric::RentToIncomeRatio,
        Metric::AffordabilityGap,
        Metric::FmrDeviation,
        Metric::IncomeGap,
        Metric::VoucherFeasibility,
        Metric::CostBurden,
        Metric::SevereCostBurden,
        Metric::HousingWage,
        Metric::HousingWageToMinimumWage,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Fmr => "FMR",
            Metric::RentToIncomeRatio => "Rent-to-Income Ratio",
            Metric::AffordabilityGap => "Affordability Gap",
            Metric::FmrDeviation => "FMR Deviation (%)",
            Metric::IncomeGap => "Income Gap",
            Metric::VoucherFeasibility => "Voucher Feasibility",
            Metric::CostBurden => "Cost Burden",
            Metric::SevereCostBurden => "Severe Cost Burden",
            Metric::HousingWage => "Housing Wage",
            Metric::HousingWageToMinimumWage => "Housing Wage vs Minimum Wage",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::Fmr => "Fair Market Rent set by HUD",
            Metric::RentToIncomeRatio => "Annual FMR as % of median income",
            Metric::AffordabilityGap => "Dollar difference between FMR and median rent",
            Metric::FmrDeviation => "Percentage difference FMR vs median rent",
            Metric::IncomeGap => "Annual rent above 30% of median income",
            Metric::VoucherFeasibility => "FMR as % of median rent",
            Metric::CostBurden => "Renters spending >30% on rent",
            Metric::SevereCostBurden => "Renters spending >50% on rent",
            Metric::HousingWage => "Hourly wage needed for FMR",
            Metric::HousingWageToMinimumWage => "Housing wage as % of state minimum wage",
        }
    }

    pub fn value_format(&self) -> ValueFormat {
        match self {
            Metric::Fmr | Metric::AffordabilityGap | Metric::IncomeGap => ValueFormat::Dollars,
            Metric::HousingWage => ValueFormat::HourlyDollars,
            _ => ValueFormat::Percent,
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        self.value_format().format(value)
    }

    /// Cost burden comes from the Census table and is the same for every bedroom count
    pub fn depends_on_bedroom(&self) -> bool {
        !matches!(self, Metric::CostBurden | Metric::SevereCostBurden)
    }

    /// Column name used in exported tables, e.g. "rent_to_income_ratio_2"
    pub fn column(&self, bedroom: BedroomType) -> String {
        let base = match self {
            Metric::Fmr => "fmr",
            Metric::RentToIncomeRatio => "rent_to_income_ratio",
            Metric::AffordabilityGap => "affordability_gap",
            Metric::FmrDeviation => "fmr_deviation",
            Metric::IncomeGap => "income_gap",
            Metric::VoucherFeasibility => "voucher_feasibility",
            Metric::CostBurden => return "cost_burden".to_string(),
            Metric::SevereCostBurden => return "severe_cost_burden".to_string(),
            Metric::HousingWage => "housing_wage",
            Metric::HousingWageToMinimumWage => "housing_wage_to_min_wage",
        };
        format!("{}_{}", base, bedroom.count())
    }

    /// Markdown table of every metric and its description
    pub fn definitions_markdown() -> String {
        let rows: Vec<String> = Metric::ALL
            .iter()
            .map(|m| format!("| **{}** | {} |", m.label(), m.description()))
            .collect();
        format!(
            "### Metric Definitions\n| Metric | Description |\n|--------|-------------|\n{}",
            rows.join("\n")
        )
    }
}

impl FromStr for Metric {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .iter()
            .find(|m| m.label().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| InputError::UnknownMetric(s.to_string()))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// DERIVED METRICS
// ============================================================================

/// Every metric for one matched county and bedroom count.
/// A field is None when one of its inputs is missing or non-positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub bedroom: BedroomType,
    pub fmr: Option<f64>,
    pub rent_to_income_ratio: Option<f64>,
    pub affordability_gap: Option<f64>,
    pub fmr_deviation: Option<f64>,
    pub income_gap: Option<f64>,
    pub voucher_feasibility: Option<f64>,
    pub cost_burden: Option<f64>,
    pub severe_cost_burden: Option<f64>,
    pub housing_wage: Option<f64>,
    pub housing_wage_to_minimum_wage: Option<f64>,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl DerivedMetrics {
    pub fn compute(
        record: &MatchedRecord,
        bedroom: BedroomType,
        config: &AggregatorConfig,
    ) -> Self {
        let fmr = record.fmr(bedroom).filter(|v| v.is_finite());
        let income = positive(record.market.median_income);
        let median_rent = positive(record.market.median_rent);
        let burden = record.market.cost_burden;

        let annual_fmr = fmr.map(|f| f * 12.0);
        let housing_wage = annual_fmr.map(|a| a / config.annual_work_hours);
        let minimum_wage = positive(config.minimum_wage(&record.state));

        DerivedMetrics {
            bedroom,
            fmr,
            rent_to_income_ratio: annual_fmr.zip(income).map(|(a, i)| a / i),
            affordability_gap: fmr.zip(median_rent).map(|(f, r)| f - r),
            fmr_deviation: fmr.zip(median_rent).map(|(f, r)| (f - r) / r),
            income_gap: annual_fmr
                .zip(income)
                .map(|(a, i)| a - i * config.affordability_share)
                .filter(|gap| *gap > 0.0),
            voucher_feasibility: fmr.zip(median_rent).map(|(f, r)| f / r),
            cost_burden: burden.and_then(|b| b.cost_burdened_share()),
            severe_cost_burden: burden.and_then(|b| b.severe_cost_burdened_share()),
            housing_wage,
            housing_wage_to_minimum_wage: housing_wage.zip(minimum_wage).map(|(h, m)| h / m),
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Fmr => self.fmr,
            Metric::RentToIncomeRatio => self.rent_to_income_ratio,
            Metric::AffordabilityGap => self.affordability_gap,
            Metric::FmrDeviation => self.fmr_deviation,
            Metric::IncomeGap => self.income_gap,
            Metric::VoucherFeasibility => self.voucher_feasibility,
            Metric::CostBurden => self.cost_burden,
            Metric::SevereCostBurden => self.severe_cost_burden,
            Metric::HousingWage => self.housing_wage,
            Metric::HousingWageToMinimumWage => self.housing_wage_to_minimum_wage,
        }
    }
}
