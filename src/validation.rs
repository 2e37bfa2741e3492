// ✅ Table validation - shape checks at the Loader/Matcher boundary
//
// Fatal problems (empty table, null county name, duplicate id) become an
// InputError. Everything else is collected as a TableIssue so the caller
// can report it without aborting the run.

use crate::error::{InputError, Result};
use crate::records::{CountyNamed, RentRecord};
use crate::states::{state_key, state_name};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IssueKind {
    /// State could not be resolved to a known FIPS code
    UnknownState,
    /// FMR decreases as bedroom count increases
    NonMonotonicFmr,
    /// Rent row has no FMR for any bedroom count
    NoFmrValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableIssue {
    pub row: usize,
    pub county_id: String,
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCheck {
    pub table: String,
    pub row_count: usize,
    pub state_count: usize,
    pub issues: Vec<TableIssue>,
}

impl TableCheck {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Table '{}': {} rows across {} states, {} issues",
            self.table,
            self.row_count,
            self.state_count,
            self.issues.len()
        )
    }
}

/// Validate a county-keyed table
///
/// Errors on an empty table, a null/blank county name, or a repeated county id.
pub fn validate_table<T: CountyNamed>(table: &str, records: &[T]) -> Result<TableCheck> {
    if records.is_empty() {
        return Err(InputError::empty(table));
    }

    let mut seen_ids = HashSet::new();
    let mut states = HashSet::new();
    let mut issues = Vec::new();

    for (row, record) in records.iter().enumerate() {
        let name_present = record
            .county_name()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false);
        if !name_present {
            return Err(InputError::missing_name(table, row));
        }

        let id = record.county_id();
        if !seen_ids.insert(id.clone()) {
            return Err(InputError::duplicate(table, id.as_str()));
        }

        if state_name(record.state()).is_none() {
            issues.push(TableIssue {
                row,
                county_id: id.to_string(),
                kind: IssueKind::UnknownState,
                message: format!("Unknown state: '{}'", record.state()),
            });
        }
        states.insert(state_key(record.state()));
    }

    let check = TableCheck {
        table: table.to_string(),
        row_count: records.len(),
        state_count: states.len(),
        issues,
    };

    if check.is_clean() {
        debug!(table, rows = check.row_count, "table validated");
    } else {
        warn!(table, issues = check.issues.len(), "table validated with issues");
    }

    Ok(check)
}

/// Validate a rent table, adding FMR-specific issues
pub fn validate_rent_table(table: &str, records: &[RentRecord]) -> Result<TableCheck> {
    let mut check = validate_table(table, records)?;

    for (row, record) in records.iter().enumerate() {
        if !record.has_any_fmr() {
            check.issues.push(TableIssue {
                row,
                county_id: record.id.to_string(),
                kind: IssueKind::NoFmrValues,
                message: "No FMR value for any bedroom count".to_string(),
            });
            continue;
        }

        let present: Vec<f64> = record.fmr.iter().flatten().copied().collect();
        if present.windows(2).any(|pair| pair[1] < pair[0]) {
            check.issues.push(TableIssue {
                row,
                county_id: record.id.to_string(),
                kind: IssueKind::NonMonotonicFmr,
                message: format!("FMR decreases with bedroom count: {:?}", record.fmr),
            });
        }
    }

    Ok(check)
}
