//! Prescription matching results.

use serde::{Deserialize, Serialize};

use super::Product;

/// How a single medicine name was classified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Best candidate qualified and was added to `found`
    Matched,
    /// Best candidate qualified but was already in `found`
    Duplicate,
    /// Candidates came back but none reached the minimum score
    NoQualifyingCandidate,
    /// Search returned nothing (or the name was blank)
    NoCandidates,
    /// Search failed for this name
    SearchFailed,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::Matched => "matched",
            MatchOutcome::Duplicate => "duplicate",
            MatchOutcome::NoQualifyingCandidate => "no_qualifying_candidate",
            MatchOutcome::NoCandidates => "no_candidates",
            MatchOutcome::SearchFailed => "search_failed",
        }
    }

    /// Whether the name is represented by a product in `found`.
    pub fn is_found(&self) -> bool {
        matches!(self, MatchOutcome::Matched | MatchOutcome::Duplicate)
    }
}

/// Per-name trace of a matching pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicineMatch {
    /// The name exactly as it was submitted
    pub query: String,
    /// Product the name resolved to, if any
    pub product_id: Option<i64>,
    /// Highest candidate score seen (0 when nothing came back)
    pub score: f64,
    pub outcome: MatchOutcome,
}

/// Result of matching a batch of medicine names against the catalog.
///
/// Every submitted name is either behind a product in `found` or listed
/// in `not_found`; `matches` records which, in submission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    /// Matched products, de-duplicated by id, in first-match order
    pub found: Vec<Product>,
    /// Names with no qualifying product
    pub not_found: Vec<String>,
    pub matches: Vec<MedicineMatch>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Product a given submitted name resolved to.
    pub fn product_for(&self, query: &str) -> Option<&Product> {
        let id = self
            .matches
            .iter()
            .find(|m| m.query == query)
            .and_then(|m| m.product_id)?;
        self.found.iter().find(|p| p.id == id)
    }

    /// Check that `query` is accounted for in exactly one output list.
    pub fn accounts_for(&self, query: &str) -> bool {
        let in_found = self.product_for(query).is_some();
        let in_not_found = self.not_found.iter().any(|n| n == query);
        in_found != in_not_found
    }
}
