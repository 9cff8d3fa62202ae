//! Prescription medicine matcher.
//!
//! Pipeline per name: Catalog search → Tiered scoring → Threshold gate → Dedup
//!
//! Each name is looked up and classified on its own; a failed lookup only
//! affects that name.

mod scoring;

pub use scoring::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{MatchOutcome, MatchResult, MedicineMatch, Product};
use medicom_extract::{medicine_names, ExtractedMedicine};

/// Search collaborator errors.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Search backend error: {0}")]
    Backend(String),
}

/// Text search over the product catalog.
///
/// Implementations do their own fuzzy/substring retrieval; the matcher only
/// re-ranks what comes back.
pub trait ProductSearch {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, SearchError>;
}

impl ProductSearch for Database {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, SearchError> {
        Ok(self.search_products(query, limit)?)
    }
}

/// Matcher tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Candidates requested from search per name
    pub candidate_limit: usize,
    /// Minimum score a candidate needs to be selected
    pub min_score: f64,
    /// Token similarity that also counts as a match in the overlap tier.
    /// `None` keeps the overlap tier to substring matches.
    pub fuzzy_token_similarity: Option<f64>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 5,
            min_score: 60.0,
            fuzzy_token_similarity: None,
        }
    }
}

/// Maps free-text medicine names to catalog products.
pub struct MedicineMatcher<'a, S: ProductSearch + ?Sized> {
    search: &'a S,
    config: MatcherConfig,
}

impl<'a, S: ProductSearch + ?Sized> MedicineMatcher<'a, S> {
    /// Create a matcher with default tunables.
    pub fn new(search: &'a S) -> Self {
        Self::with_config(search, MatcherConfig::default())
    }

    pub fn with_config(search: &'a S, config: MatcherConfig) -> Self {
        Self { search, config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match medicine names against the catalog.
    pub fn match_names<T: AsRef<str>>(&self, names: &[T]) -> MatchResult {
        let mut result = MatchResult::default();

        for name in names {
            let name = name.as_ref();
            let entry = self.match_one(name, &mut result.found);
            if !entry.outcome.is_found() {
                result.not_found.push(name.to_string());
            }
            result.matches.push(entry);
        }

        tracing::info!(
            "matched {} names: {} products found, {} not found",
            names.len(),
            result.found.len(),
            result.not_found.len()
        );
        result
    }

    /// Match the names of extracted medicines.
    pub fn match_extracted(&self, medicines: &[ExtractedMedicine]) -> MatchResult {
        self.match_names(&medicine_names(medicines))
    }

    /// Classify one name, appending its product to `found` when new.
    fn match_one(&self, name: &str, found: &mut Vec<Product>) -> MedicineMatch {
        let unmatched = |score: f64, outcome: MatchOutcome| MedicineMatch {
            query: name.to_string(),
            product_id: None,
            score,
            outcome,
        };

        if name.trim().is_empty() {
            return unmatched(0.0, MatchOutcome::NoCandidates);
        }

        let candidates = match self.search.search(name, self.config.candidate_limit) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("search for {:?} failed: {}", name, e);
                return unmatched(0.0, MatchOutcome::SearchFailed);
            }
        };

        if candidates.is_empty() {
            tracing::debug!("no candidates for {:?}", name);
            return unmatched(0.0, MatchOutcome::NoCandidates);
        }

        let mut best: Option<(Product, f64)> = None;
        let mut best_seen = 0.0_f64;

        for product in candidates {
            let score = score_name(name, &product.name, self.config.fuzzy_token_similarity);
            tracing::debug!("{:?} vs {:?}: {:.1}", name, product.name, score);

            best_seen = best_seen.max(score);
            let best_score = best.as_ref().map_or(0.0, |(_, s)| *s);
            if score > best_score && score >= self.config.min_score {
                best = Some((product, score));
            }
        }

        let Some((product, score)) = best else {
            return unmatched(best_seen, MatchOutcome::NoQualifyingCandidate);
        };

        let outcome = if found.iter().any(|p| p.id == product.id) {
            MatchOutcome::Duplicate
        } else {
            MatchOutcome::Matched
        };
        let product_id = product.id;
        if outcome == MatchOutcome::Matched {
            found.push(product);
        }

        MedicineMatch {
            query: name.to_string(),
            product_id: Some(product_id),
            score,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Search stub: fixed results per query, optional failures.
    #[derive(Default)]
    struct StubSearch {
        results: HashMap<String, Vec<Product>>,
        failing: Vec<String>,
    }

    impl StubSearch {
        fn with(mut self, query: &str, products: Vec<Product>) -> Self {
            self.results.insert(query.to_string(), products);
            self
        }

        fn failing(mut self, query: &str) -> Self {
            self.failing.push(query.to_string());
            self
        }
    }

    impl ProductSearch for StubSearch {
        fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, SearchError> {
            if self.failing.iter().any(|q| q == query) {
                return Err(SearchError::Backend("connection reset".into()));
            }
            Ok(self
                .results
                .get(query)
                .map(|r| r.iter().take(limit).cloned().collect())
                .unwrap_or_default())
        }
    }

    fn product(id: i64, name: &str) -> Product {
        Product::new(id, 1, name.into(), 1.0)
    }

    #[test]
    fn test_example_batch() {
        let search = StubSearch::default()
            .with("Paracetamol 500mg", vec![product(1, "Paracetamol")])
            .with("Xyzmedicine123", vec![]);
        let matcher = MedicineMatcher::new(&search);

        let result = matcher.match_names(&["Paracetamol 500mg", "Xyzmedicine123"]);

        assert_eq!(result.found.len(), 1);
        assert_eq!(result.found[0].name, "Paracetamol");
        assert_eq!(result.not_found, vec!["Xyzmedicine123"]);
        assert_eq!(result.matches[0].outcome, MatchOutcome::Matched);
        assert_eq!(result.matches[1].outcome, MatchOutcome::NoCandidates);
    }

    #[test]
    fn test_exact_match_wins() {
        let search = StubSearch::default().with(
            "Paracetamol",
            vec![
                product(1, "Paracetamol 500mg Tablets"),
                product(2, "Paracetamol"),
                product(3, "Paracetamol Syrup"),
            ],
        );
        let result = MedicineMatcher::new(&search).match_names(&["Paracetamol"]);

        assert_eq!(result.found.len(), 1);
        assert_eq!(result.found[0].id, 2);
        assert_eq!(result.matches[0].score, EXACT_SCORE);
    }

    #[test]
    fn test_first_of_equal_scores_wins() {
        let search = StubSearch::default().with(
            "ibuprofen",
            vec![product(1, "Ibuprofen 200mg"), product(2, "Ibuprofen 400mg")],
        );
        let result = MedicineMatcher::new(&search).match_names(&["ibuprofen"]);
        assert_eq!(result.found[0].id, 1);
    }

    #[test]
    fn test_below_threshold_not_selected() {
        let search = StubSearch::default().with(
            "vitamin d3,",
            vec![product(1, "Vitamin D3 Drops"), product(2, "Cetirizine")],
        );
        let result = MedicineMatcher::new(&search).match_names(&["vitamin d3,"]);

        assert!(result.found.is_empty());
        assert_eq!(result.not_found, vec!["vitamin d3,"]);
        assert_eq!(result.matches[0].outcome, MatchOutcome::NoQualifyingCandidate);
        assert!((result.matches[0].score - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_variants_dedup_to_one_product() {
        let para = product(1, "Paracetamol");
        let search = StubSearch::default()
            .with("paracetamol", vec![para.clone()])
            .with("PARACETAMOL 500", vec![para]);
        let result = MedicineMatcher::new(&search).match_names(&["paracetamol", "PARACETAMOL 500"]);

        assert_eq!(result.found.len(), 1);
        assert!(result.not_found.is_empty());
        assert_eq!(result.matches[1].outcome, MatchOutcome::Duplicate);
        assert_eq!(result.matches[1].product_id, Some(1));
        assert!(result.accounts_for("PARACETAMOL 500"));
    }

    #[test]
    fn test_search_failure_is_isolated() {
        let search = StubSearch::default()
            .failing("Amoxicillin")
            .with("Cetirizine", vec![product(4, "Cetirizine")]);
        let result = MedicineMatcher::new(&search).match_names(&["Amoxicillin", "Cetirizine"]);

        assert_eq!(result.not_found, vec!["Amoxicillin"]);
        assert_eq!(result.matches[0].outcome, MatchOutcome::SearchFailed);
        assert_eq!(result.found.len(), 1);
        assert_eq!(result.found[0].id, 4);
    }

    #[test]
    fn test_blank_names_skip_search() {
        let search = StubSearch::default().failing("   ");
        let result = MedicineMatcher::new(&search).match_names(&["   "]);

        assert_eq!(result.not_found, vec!["   "]);
        assert_eq!(result.matches[0].outcome, MatchOutcome::NoCandidates);
    }

    #[test]
    fn test_empty_input() {
        let search = StubSearch::default();
        let names: [&str; 0] = [];
        let result = MedicineMatcher::new(&search).match_names(&names);
        assert!(result.is_empty());
        assert!(result.found.is_empty());
        assert!(result.not_found.is_empty());
    }

    #[test]
    fn test_candidate_limit_is_passed() {
        let search = StubSearch::default().with(
            "cough",
            vec![product(1, "Lozenges"), product(2, "Cough Syrup")],
        );
        let config = MatcherConfig {
            candidate_limit: 1,
            ..Default::default()
        };
        let result = MedicineMatcher::with_config(&search, config).match_names(&["cough"]);

        // Only "Lozenges" is seen, which does not qualify
        assert!(result.found.is_empty());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: MatcherConfig = serde_json::from_str(r#"{"min_score": 80.0}"#).unwrap();
        assert_eq!(config.min_score, 80.0);
        assert_eq!(config.candidate_limit, 5);
        assert_eq!(config.fuzzy_token_similarity, None);
    }

    #[test]
    fn test_match_extracted() {
        let search = StubSearch::default().with("Cetirizine", vec![product(4, "Cetirizine 10mg")]);
        let medicines = vec![ExtractedMedicine {
            name: "Cetirizine".into(),
            confidence: 0.95,
        }];
        let result = MedicineMatcher::new(&search).match_extracted(&medicines);
        assert_eq!(result.found[0].id, 4);
        assert_eq!(result.matches[0].score, PREFIX_SCORE);
    }

    #[test]
    fn test_fuzzy_tokens_are_opt_in() {
        let search = StubSearch::default().with("Amoxicilin", vec![product(3, "Amoxicillin")]);

        let strict = MedicineMatcher::new(&search).match_names(&["Amoxicilin"]);
        assert_eq!(strict.not_found, vec!["Amoxicilin"]);
        assert_eq!(strict.matches[0].outcome, MatchOutcome::NoQualifyingCandidate);

        let config = MatcherConfig {
            fuzzy_token_similarity: Some(0.85),
            ..Default::default()
        };
        let fuzzy = MedicineMatcher::with_config(&search, config).match_names(&["Amoxicilin"]);
        assert_eq!(fuzzy.found[0].id, 3);
        assert!((fuzzy.matches[0].score - TOKEN_OVERLAP_MAX).abs() < 1e-9);
    }
}
