//! Golden tests for the prescription matcher.
//!
//! These tests run known OCR-style names against a small catalog.

use medicom_core::db::Database;
use medicom_core::matcher::{score_name, MatcherConfig, MedicineMatcher};
use medicom_core::models::{Category, MatchOutcome, Product};

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    query: &'static str,
    expected_product: Option<&'static str>,
    expected_outcome: MatchOutcome,
}

fn setup_catalog() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.upsert_category(&Category::new(1, "Pain Relief".into())).unwrap();
    db.upsert_category(&Category::new(2, "Antibiotics".into())).unwrap();
    db.upsert_category(&Category::new(3, "Allergy".into())).unwrap();

    let items = [
        (1, 1, "Paracetamol", "Fever and mild pain relief tablets"),
        (2, 1, "Ibuprofen 400mg", "Anti-inflammatory painkiller"),
        (3, 2, "Amoxicillin 250mg Capsules", "Broad spectrum antibiotic"),
        (4, 3, "Cetirizine", "Non-drowsy antihistamine"),
        (5, 3, "Loratadine", "Antihistamine tablets"),
    ];
    for (id, category_id, name, description) in items {
        let mut product = Product::new(id, category_id, name.into(), 5.0);
        product.description = description.into();
        product.stock = 25;
        db.upsert_product(&product).unwrap();
    }
    db
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "exact",
            query: "Paracetamol",
            expected_product: Some("Paracetamol"),
            expected_outcome: MatchOutcome::Matched,
        },
        GoldenCase {
            id: "exact-shouting",
            query: "CETIRIZINE",
            expected_product: Some("Cetirizine"),
            expected_outcome: MatchOutcome::Matched,
        },
        GoldenCase {
            id: "dose-suffix-on-query",
            query: "Paracetamol 500mg",
            expected_product: Some("Paracetamol"),
            expected_outcome: MatchOutcome::Matched,
        },
        GoldenCase {
            id: "prefix-of-product",
            query: "Ibuprofen",
            expected_product: Some("Ibuprofen 400mg"),
            expected_outcome: MatchOutcome::Matched,
        },
        GoldenCase {
            id: "prefix-with-dose",
            query: "Amoxicillin 250",
            expected_product: Some("Amoxicillin 250mg Capsules"),
            expected_outcome: MatchOutcome::Matched,
        },
        GoldenCase {
            id: "truncated-name",
            query: "Loratadin",
            expected_product: Some("Loratadine"),
            expected_outcome: MatchOutcome::Matched,
        },
        GoldenCase {
            id: "partial-token-overlap",
            query: "Cetirizin tablets",
            expected_product: None,
            expected_outcome: MatchOutcome::NoQualifyingCandidate,
        },
        GoldenCase {
            id: "description-only-hit",
            query: "antihistamine",
            expected_product: None,
            expected_outcome: MatchOutcome::NoQualifyingCandidate,
        },
        GoldenCase {
            id: "unknown",
            query: "Xyzmedicine123",
            expected_product: None,
            expected_outcome: MatchOutcome::NoCandidates,
        },
    ]
}

#[test]
fn test_golden_cases() {
    let db = setup_catalog();
    let matcher = MedicineMatcher::new(&db);

    for case in get_golden_cases() {
        let result = matcher.match_names(&[case.query]);
        let entry = &result.matches[0];

        assert_eq!(
            entry.outcome, case.expected_outcome,
            "Case {}: outcome mismatch", case.id
        );
        assert_eq!(
            result.found.first().map(|p| p.name.as_str()),
            case.expected_product,
            "Case {}: product mismatch", case.id
        );
        assert!(
            result.accounts_for(case.query),
            "Case {}: name not accounted for", case.id
        );
    }
}

#[test]
fn test_whole_prescription_batch() {
    let db = setup_catalog();
    let matcher = MedicineMatcher::new(&db);

    let names = [
        "Paracetamol",
        "paracetamol",
        "PARACETAMOL 500",
        "Ibuprofen",
        "Vitamin D3",
        "Cetirizine 10",
    ];
    let result = matcher.match_names(&names);

    let found: Vec<&str> = result.found.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(found, vec!["Paracetamol", "Ibuprofen 400mg", "Cetirizine"]);
    assert_eq!(result.not_found, vec!["Vitamin D3"]);

    for name in names {
        assert!(result.accounts_for(name), "{} dropped", name);
    }
}

#[test]
fn test_strict_threshold_config() {
    let db = setup_catalog();
    let config = MatcherConfig {
        min_score: 95.0,
        ..Default::default()
    };
    let matcher = MedicineMatcher::with_config(&db, config);

    let result = matcher.match_names(&["Ibuprofen", "Cetirizine"]);
    assert_eq!(result.not_found, vec!["Ibuprofen"]);
    assert_eq!(result.found[0].name, "Cetirizine");
}

#[test]
fn test_score_tiers_table() {
    let cases = [
        ("paracetamol", "Paracetamol", 100.0),
        ("amox", "Amoxicillin 250mg Capsules", 90.0),
        ("400mg", "Ibuprofen 400mg", 80.0),
        ("Cetirizine 10mg tablets", "Cetirizine", 70.0),
        ("capsules amoxicillin", "Amoxicillin 250mg Capsules", 40.0),
        ("aspirin", "Loratadine", 0.0),
    ];

    for (query, candidate, expected) in cases {
        let score = score_name(query, candidate, None);
        assert!(
            (score - expected).abs() < 1e-9,
            "{} vs {}: expected {}, got {}",
            query, candidate, expected, score
        );
    }
}
