// ⚠️ Error taxonomy
//
// InputError is the only fatal kind: empty or malformed input tables and
// bad configuration. Unmatched counties and empty statistics are data, not
// errors (see matcher::UnmatchedRecord and stats::StatsOutcome::Empty).

use thiserror::Error;

/// Result type for the matching and aggregation core
pub type Result<T> = std::result::Result<T, InputError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// A source table had no rows
    #[error("input table '{table}' is empty")]
    EmptyTable { table: String },

    /// A record carried a null or blank county name
    #[error("record {row} in table '{table}' has no county name")]
    MissingCountyName { table: String, row: usize },

    /// Two records in one table share a county identifier
    #[error("county id '{id}' appears more than once in table '{table}'")]
    DuplicateCountyId { table: String, id: String },

    /// Bedroom selector outside 0..=4 or unparseable label
    #[error("invalid bedroom selector: {0}")]
    InvalidBedroom(String),

    /// Metric label not in the catalogue
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl InputError {
    pub fn empty(table: &str) -> Self {
        InputError::EmptyTable {
            table: table.to_string(),
        }
    }

    pub fn missing_name(table: &str, row: usize) -> Self {
        InputError::MissingCountyName {
            table: table.to_string(),
            row,
        }
    }

    pub fn duplicate(table: &str, id: &str) -> Self {
        InputError::DuplicateCountyId {
            table: table.to_string(),
            id: id.to_string(),
        }
    }
}
