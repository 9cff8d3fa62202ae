//! Tiered name scoring for prescription matching.
//!
//! Tiers (case-insensitive, highest wins):
//! - exact: 100
//! - candidate starts with query: 90
//! - candidate contains query: 80
//! - query contains candidate: 70
//! - token overlap: up to 60

use strsim::normalized_levenshtein;

pub const EXACT_SCORE: f64 = 100.0;
pub const PREFIX_SCORE: f64 = 90.0;
pub const CONTAINS_SCORE: f64 = 80.0;
pub const CONTAINED_SCORE: f64 = 70.0;
pub const TOKEN_OVERLAP_MAX: f64 = 60.0;

/// Score a catalog product name against a medicine name (0 - 100).
///
/// `fuzzy_token_similarity` additionally lets two tokens match when their
/// normalized Levenshtein similarity reaches the threshold.
pub fn score_name(query: &str, candidate: &str, fuzzy_token_similarity: Option<f64>) -> f64 {
    let query = query.to_lowercase();
    let candidate = candidate.to_lowercase();

    if candidate == query {
        EXACT_SCORE
    } else if candidate.starts_with(&query) {
        PREFIX_SCORE
    } else if candidate.contains(&query) {
        CONTAINS_SCORE
    } else if query.contains(&candidate) {
        CONTAINED_SCORE
    } else {
        token_overlap(&query, &candidate, fuzzy_token_similarity)
    }
}

/// Share of candidate tokens that match some query token, scaled to 60.
///
/// Divides by the larger of the two token counts so extra words on either
/// side lower the score.
fn token_overlap(query: &str, candidate: &str, fuzzy_token_similarity: Option<f64>) -> f64 {
    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    let candidate_tokens: Vec<&str> = candidate.split_whitespace().collect();

    let denominator = query_tokens.len().max(candidate_tokens.len());
    if denominator == 0 {
        return 0.0;
    }

    let matching = candidate_tokens
        .iter()
        .filter(|c| {
            query_tokens
                .iter()
                .any(|q| tokens_match(q, c, fuzzy_token_similarity))
        })
        .count();

    matching as f64 / denominator as f64 * TOKEN_OVERLAP_MAX
}

fn tokens_match(query: &str, candidate: &str, fuzzy_token_similarity: Option<f64>) -> bool {
    if candidate.contains(query) || query.contains(candidate) {
        return true;
    }
    match fuzzy_token_similarity {
        Some(threshold) => normalized_levenshtein(query, candidate) >= threshold,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(query: &str, candidate: &str) -> f64 {
        score_name(query, candidate, None)
    }

    #[test]
    fn test_tiers() {
        assert_eq!(score("Paracetamol", "paracetamol"), EXACT_SCORE);
        assert_eq!(score("parac", "Paracetamol 500mg"), PREFIX_SCORE);
        assert_eq!(score("cetamol", "Paracetamol"), CONTAINS_SCORE);
        assert_eq!(score("Paracetamol 500mg", "Paracetamol"), CONTAINED_SCORE);
    }

    #[test]
    fn test_token_overlap() {
        // "d3" ⊂ "d3," and "vitamin" matches: 2 of max(2, 3) tokens
        let s = score("vitamin d3,", "Vitamin D3 Drops");
        assert!((s - 40.0).abs() < 1e-9);

        // Same words, different order: every token matches
        assert!((score("500 amoxicillin", "Amoxicillin 500") - 60.0).abs() < 1e-9);

        // Nothing in common
        assert_eq!(score("ibuprofen", "Cetirizine"), 0.0);
    }

    #[test]
    fn test_fuzzy_tokens() {
        // One misread letter
        assert_eq!(score("Amoxicilin 250", "Amoxicillin 500"), 0.0);
        let fuzzy = score_name("Amoxicilin 250", "Amoxicillin 500", Some(0.85));
        assert!((fuzzy - 30.0).abs() < 1e-9);

        let fuzzy = score_name("Amoxicilin", "Amoxicillin", Some(0.85));
        assert!((fuzzy - 60.0).abs() < 1e-9);

        // Unrelated words stay apart
        assert_eq!(score_name("Ibuprofen", "Cetirizine", Some(0.85)), 0.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(score("", ""), EXACT_SCORE);
        assert_eq!(token_overlap("", "", None), 0.0);
    }
}
