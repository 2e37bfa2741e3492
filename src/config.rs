//! Configuration for matching thresholds and derived-metric divisors
//!
//! Resolution order:
//! 1. Explicit TOML file passed to [`Config::load`]
//! 2. TOML file named by `FMR_ATLAS_CONFIG`
//! 3. Compiled defaults
//!
//! `FMR_ATLAS_FUZZY_THRESHOLD` overrides the matcher threshold on top of
//! whichever source won.

use crate::error::InputError;
use crate::matcher::{CountyMatcher, DEFAULT_FUZZY_THRESHOLD};
use crate::states::state_key;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "FMR_ATLAS_CONFIG";
pub const FUZZY_THRESHOLD_ENV: &str = "FMR_ATLAS_FUZZY_THRESHOLD";

/// 40 hours/week × 52 weeks
pub const DEFAULT_ANNUAL_WORK_HOURS: f64 = 2080.0;

/// Rent is "affordable" at or below this share of income
pub const DEFAULT_AFFORDABILITY_SHARE: f64 = 0.30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub fuzzy_threshold: u8,
    pub exclusive_candidates: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            exclusive_candidates: false,
        }
    }
}

impl MatcherConfig {
    pub fn build(&self) -> CountyMatcher {
        CountyMatcher {
            fuzzy_threshold: self.fuzzy_threshold,
            exclusive_candidates: self.exclusive_candidates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Housing wage divisor: full-time hours per year
    pub annual_work_hours: f64,

    /// Share of income used for the income gap
    pub affordability_share: f64,

    /// Hourly minimum wage by state (FIPS, USPS code or name)
    pub minimum_wages: BTreeMap<String, f64>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            annual_work_hours: DEFAULT_ANNUAL_WORK_HOURS,
            affordability_share: DEFAULT_AFFORDABILITY_SHARE,
            minimum_wages: BTreeMap::new(),
        }
    }
}

impl AggregatorConfig {
    /// Minimum wage for a state in any accepted spelling
    pub fn minimum_wage(&self, state: &str) -> Option<f64> {
        let key = state_key(state);
        self.minimum_wages
            .iter()
            .find(|(configured, _)| state_key(configured) == key)
            .map(|(_, wage)| *wage)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matcher: MatcherConfig,
    pub aggregator: AggregatorConfig,
}

impl Config {
    /// Parse TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file, the `FMR_ATLAS_CONFIG` file, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let chosen = path
            .map(Path::to_path_buf)
            .or_else(|| env_path.map(Into::into));

        let mut config = match chosen {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                info!(path = %path.display(), "loaded configuration file");
                Self::from_toml_str(&content)?
            }
            None => {
                debug!("no configuration file, using defaults");
                Config::default()
            }
        };

        if let Ok(raw) = std::env::var(FUZZY_THRESHOLD_ENV) {
            config.matcher.fuzzy_threshold = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be 0-100, got '{}'", FUZZY_THRESHOLD_ENV, raw))?;
            debug!(threshold = config.matcher.fuzzy_threshold, "fuzzy threshold from environment");
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_default() -> Result<Self> {
        Self::load(None)
    }

    pub fn validate(&self) -> std::result::Result<(), InputError> {
        if self.matcher.fuzzy_threshold > 100 {
            return Err(InputError::InvalidConfig(format!(
                "fuzzy_threshold must be 0-100, got {}",
                self.matcher.fuzzy_threshold
            )));
        }

        let hours = self.aggregator.annual_work_hours;
        if !hours.is_finite() || hours <= 0.0 {
            return Err(InputError::InvalidConfig(format!(
                "annual_work_hours must be positive, got {}",
                hours
            )));
        }

        let share = self.aggregator.affordability_share;
        if !(share > 0.0 && share <= 1.0) {
            return Err(InputError::InvalidConfig(format!(
                "affordability_share must be in (0, 1], got {}",
                share
            )));
        }

        if let Some((state, wage)) = self
            .aggregator
            .minimum_wages
            .iter()
            .find(|(_, wage)| !wage.is_finite() || **wage <= 0.0)
        {
            return Err(InputError::InvalidConfig(format!(
                "minimum wage for {} must be positive, got {}",
                state, wage
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Tests that read or write the process environment take this lock
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.matcher.fuzzy_threshold, 80);
        assert_eq!(config.aggregator.annual_work_hours, 2080.0);
        assert_eq!(config.aggregator.affordability_share, 0.30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [matcher]
            fuzzy_threshold = 90

            [aggregator.minimum_wages]
            MO = 13.75
            "06" = 16.5
            "#,
        )
        .unwrap();

        assert_eq!(config.matcher.fuzzy_threshold, 90);
        assert!(!config.matcher.exclusive_candidates);
        assert_eq!(config.aggregator.annual_work_hours, 2080.0);
        assert_eq!(config.aggregator.minimum_wage("Missouri"), Some(13.75));
        assert_eq!(config.aggregator.minimum_wage("CA"), Some(16.5));
        assert_eq!(config.aggregator.minimum_wage("TX"), None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml_str("[matcher]\nfuzzy_threshold = 101").is_err());
        assert!(Config::from_toml_str("[aggregator]\nannual_work_hours = 0.0").is_err());
        assert!(Config::from_toml_str("[aggregator]\naffordability_share = 1.5").is_err());
        assert!(Config::from_toml_str("[aggregator.minimum_wages]\nMO = -1.0").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[aggregator]\nannual_work_hours = 2000.0").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.aggregator.annual_work_hours, 2000.0);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = Config::load(Some(Path::new("/nonexistent/fmr_atlas.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[aggregator]\nannual_work_hours = 2000.0").unwrap();

        std::env::set_var(CONFIG_PATH_ENV, file.path());
        std::env::remove_var(FUZZY_THRESHOLD_ENV);
        let config = Config::from_env_or_default().unwrap();
        assert_eq!(config.aggregator.annual_work_hours, 2000.0);
        assert_eq!(config.matcher.fuzzy_threshold, 80);

        std::env::set_var(FUZZY_THRESHOLD_ENV, " 90 ");
        let config = Config::from_env_or_default().unwrap();
        assert_eq!(config.matcher.fuzzy_threshold, 90);
        assert_eq!(config.aggregator.annual_work_hours, 2000.0);

        std::env::set_var(FUZZY_THRESHOLD_ENV, "ninety");
        let err = Config::from_env_or_default().unwrap_err();
        assert!(err.to_string().contains(FUZZY_THRESHOLD_ENV), "{:#}", err);

        std::env::set_var(FUZZY_THRESHOLD_ENV, "101");
        assert!(Config::from_env_or_default().is_err());

        std::env::remove_var(FUZZY_THRESHOLD_ENV);
        std::env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(Config::from_env_or_default().unwrap(), Config::default());
        println!("✅ env overrides applied and rejected");
    }

    #[test]
    fn test_matcher_config_builds_matcher() {
        let matcher = MatcherConfig {
            fuzzy_threshold: 70,
            exclusive_candidates: true,
        }
        .build();
        assert_eq!(matcher.fuzzy_threshold, 70);
        assert!(matcher.exclusive_candidates);
    }
}
