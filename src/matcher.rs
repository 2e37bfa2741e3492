// 🔗 County Matcher - reconcile county names across sources
// Two strategies: Exact Match on (normalized name, state), then Fuzzy Match
// with token sort ratio against same-state candidates.

use crate::error::Result;
use crate::records::{CountyId, CountyNamed, MarketRecord, MatchedRecord, RentRecord};
use crate::similarity::{normalize_county_name, token_sort_ratio};
use crate::states::state_key;
use crate::validation::validate_table;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Default minimum token sort ratio for a fuzzy match
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;

/// Confidence reported for exact matches
pub const EXACT_CONFIDENCE: u8 = 100;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Same normalized county name, same state
    ExactMatch,

    /// Best same-state token sort ratio at or above the threshold
    FuzzyMatch,
}

// ============================================================================
// MATCH RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyMatch {
    /// Position in the left table
    pub left_index: usize,

    /// Position in the right table
    pub right_index: usize,

    pub left_id: CountyId,
    pub right_id: CountyId,

    /// 100 for exact matches, the token sort ratio for fuzzy ones. A fuzzy
    /// match scores 100 when only the token order differs.
    pub confidence: u8,

    pub strategy: MatchStrategy,

    /// Human-readable reason
    pub reason: String,
}

/// A left record with no acceptable right candidate. Not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedRecord {
    pub left_index: usize,
    pub county_id: CountyId,
    pub county_name: String,
    pub state: String,

    /// Closest same-state candidate by score, whether or not it was free
    pub best_candidate: Option<String>,
    pub best_score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub matches: Vec<CountyMatch>,
    pub unmatched: Vec<UnmatchedRecord>,
    pub left_count: usize,
    pub right_count: usize,
    pub fuzzy_threshold: u8,
}

impl MatchReport {
    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    pub fn exact_count(&self) -> usize {
        self.count_by(MatchStrategy::ExactMatch)
    }

    pub fn fuzzy_count(&self) -> usize {
        self.count_by(MatchStrategy::FuzzyMatch)
    }

    fn count_by(&self, strategy: MatchStrategy) -> usize {
        self.matches.iter().filter(|m| m.strategy == strategy).count()
    }

    /// Share of left records that found a partner, 0.0-1.0
    pub fn match_rate(&self) -> f64 {
        if self.left_count == 0 {
            0.0
        } else {
            self.matches.len() as f64 / self.left_count as f64
        }
    }

    /// Match for a given left record, if any
    pub fn match_for(&self, left_index: usize) -> Option<&CountyMatch> {
        self.matches.iter().find(|m| m.left_index == left_index)
    }

    pub fn summary(&self) -> String {
        format!(
            "Matched {} of {} counties ({} exact, {} fuzzy at >= {}), {} unmatched",
            self.matches.len(),
            self.left_count,
            self.exact_count(),
            self.fuzzy_count(),
            self.fuzzy_threshold,
            self.unmatched.len()
        )
    }
}

// ============================================================================
// COUNTY MATCHER
// ============================================================================

/// Prepared right-hand candidate
struct Candidate<'a> {
    index: usize,
    normalized: String,
    raw: &'a str,
}

impl Candidate<'_> {
    /// Deterministic order for tie-breaks: normalized name, raw name, position
    fn tie_order(&self, other: &Candidate<'_>) -> Ordering {
        self.normalized
            .cmp(&other.normalized)
            .then_with(|| self.raw.cmp(other.raw))
            .then_with(|| self.index.cmp(&other.index))
    }
}

#[derive(Debug, Clone)]
pub struct CountyMatcher {
    /// Minimum token sort ratio accepted for a fuzzy match (default: 80)
    pub fuzzy_threshold: u8,

    /// Each right record goes to at most one left record, exact matches
    /// first (default: false, every same-state candidate is scored)
    pub exclusive_candidates: bool,
}

impl CountyMatcher {
    /// Create matcher with default threshold
    pub fn new() -> Self {
        CountyMatcher {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            exclusive_candidates: false,
        }
    }

    pub fn with_threshold(fuzzy_threshold: u8) -> Self {
        CountyMatcher {
            fuzzy_threshold,
            ..Self::new()
        }
    }

    /// Map each left record to at most one right record
    ///
    /// Fails when either table is empty, a county name is null or blank, or
    /// a county id repeats within a table. Records without a partner are
    /// reported in `MatchReport::unmatched`.
    pub fn match_records<L: CountyNamed, R: CountyNamed>(
        &self,
        left: &[L],
        right: &[R],
    ) -> Result<MatchReport> {
        validate_table("left", left)?;
        validate_table("right", right)?;

        // Right candidates bucketed by state, each bucket in tie-break order
        let mut by_state: BTreeMap<String, Vec<Candidate<'_>>> = BTreeMap::new();
        for (index, record) in right.iter().enumerate() {
            let raw = record.county_name().unwrap_or_default();
            by_state
                .entry(state_key(record.state()))
                .or_default()
                .push(Candidate {
                    index,
                    normalized: normalize_county_name(raw),
                    raw,
                });
        }
        for bucket in by_state.values_mut() {
            bucket.sort_by(|a, b| a.tie_order(b));
        }

        let left_keys: Vec<(String, String)> = left
            .iter()
            .map(|record| {
                (
                    state_key(record.state()),
                    normalize_county_name(record.county_name().unwrap_or_default()),
                )
            })
            .collect();

        let mut claimed: HashSet<usize> = HashSet::new();
        let mut found: Vec<Option<CountyMatch>> = vec![None; left.len()];

        // Strategy 1: exact (normalized name, state)
        for (i, (state, name)) in left_keys.iter().enumerate() {
            let Some(bucket) = by_state.get(state) else {
                continue;
            };
            let hit = bucket
                .iter()
                .find(|c| c.normalized == *name && self.available(&claimed, c.index));

            if let Some(candidate) = hit {
                claimed.insert(candidate.index);
                found[i] = Some(CountyMatch {
                    left_index: i,
                    right_index: candidate.index,
                    left_id: left[i].county_id().clone(),
                    right_id: right[candidate.index].county_id().clone(),
                    confidence: EXACT_CONFIDENCE,
                    strategy: MatchStrategy::ExactMatch,
                    reason: format!("Exact match: {} ({})", name, left[i].state()),
                });
            }
        }

        // Strategy 2: fuzzy, same state only
        let mut unmatched = Vec::new();
        for (i, (state, name)) in left_keys.iter().enumerate() {
            if found[i].is_some() {
                continue;
            }

            let scored: Vec<(&Candidate<'_>, u8)> = by_state
                .get(state)
                .map(|bucket| {
                    bucket
                        .iter()
                        .map(|c| (c, token_sort_ratio(name, &c.normalized)))
                        .collect()
                })
                .unwrap_or_default();
            let best_overall = best_of(scored.iter().copied());
            let best = best_of(
                scored
                    .iter()
                    .copied()
                    .filter(|(c, _)| self.available(&claimed, c.index)),
            );

            let left_name = left[i].county_name().unwrap_or_default();
            match best {
                Some((candidate, score)) if score >= self.fuzzy_threshold => {
                    debug!(
                        left = left_name,
                        right = candidate.raw,
                        score,
                        "fuzzy county match"
                    );
                    claimed.insert(candidate.index);
                    found[i] = Some(CountyMatch {
                        left_index: i,
                        right_index: candidate.index,
                        left_id: left[i].county_id().clone(),
                        right_id: right[candidate.index].county_id().clone(),
                        confidence: score,
                        strategy: MatchStrategy::FuzzyMatch,
                        reason: format!(
                            "Fuzzy match: {} ≈ {} ({}) score {}",
                            left_name,
                            candidate.raw,
                            left[i].state(),
                            score
                        ),
                    });
                }
                _ => {
                    unmatched.push(UnmatchedRecord {
                        left_index: i,
                        county_id: left[i].county_id().clone(),
                        county_name: left_name.to_string(),
                        state: left[i].state().to_string(),
                        best_candidate: best_overall.map(|(c, _)| c.raw.to_string()),
                        best_score: best_overall.map(|(_, score)| score),
                    });
                }
            }
        }

        let report = MatchReport {
            matches: found.into_iter().flatten().collect(),
            unmatched,
            left_count: left.len(),
            right_count: right.len(),
            fuzzy_threshold: self.fuzzy_threshold,
        };

        info!(
            matched = report.matched_count(),
            exact = report.exact_count(),
            fuzzy = report.fuzzy_count(),
            unmatched = report.unmatched_count(),
            "county matching complete"
        );

        Ok(report)
    }

    /// Reconcile rent and market tables into matched records
    ///
    /// Rent records are the left side: the matched record keeps the rent
    /// county id, name and state.
    pub fn join(
        &self,
        rents: &[RentRecord],
        markets: &[MarketRecord],
    ) -> Result<(Vec<MatchedRecord>, MatchReport)> {
        let report = self.match_records(rents, markets)?;

        let matched = report
            .matches
            .iter()
            .map(|m| {
                let rent = &rents[m.left_index];
                MatchedRecord {
                    id: rent.id.clone(),
                    county_name: rent.county_name.clone().unwrap_or_default(),
                    state: rent.state.clone(),
                    rent: rent.clone(),
                    market: markets[m.right_index].clone(),
                    confidence: m.confidence,
                    strategy: m.strategy,
                }
            })
            .collect();

        Ok((matched, report))
    }

    fn available(&self, claimed: &HashSet<usize>, index: usize) -> bool {
        !self.exclusive_candidates || !claimed.contains(&index)
    }
}

/// Highest score; candidates arrive in tie-break order, so the first wins ties
fn best_of<'c, 'a>(
    scored: impl Iterator<Item = (&'c Candidate<'a>, u8)>,
) -> Option<(&'c Candidate<'a>, u8)> {
    scored.fold(None, |best, (c, score)| match best {
        Some((_, best_score)) if best_score >= score => best,
        _ => Some((c, score)),
    })
}

impl Default for CountyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
