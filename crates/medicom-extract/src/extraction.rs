//! Medicine-name extraction from raw prescription text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("OCR failure: {0}")]
    Ocr(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// A medicine name guessed from prescription text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedMedicine {
    /// Name as it appears in the text
    pub name: String,
    /// Heuristic confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// Confidence for names found next to a dosage ("Paracetamol 500mg").
pub const DOSAGE_CONFIDENCE: f64 = 0.95;

/// Confidence for names only found as numbered list entries.
pub const LIST_CONFIDENCE: f64 = 0.85;

/// Words the patterns pick up that are never medicines.
const STOP_WORDS: [&str; 6] = ["Take", "tablet", "capsule", "Patient", "Date", "Signature"];

fn dosage_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\w+(?:\s+\w+)?)\s+\d+\s*(?:mg|mcg|g|ml|iu)")
            .expect("dosage pattern is valid")
    })
}

fn list_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+\.\s*([A-Z][a-z]+(?:\s+[A-Z]?\d*)?)").expect("list pattern is valid")
    })
}

/// Extract candidate medicine names from prescription text.
///
/// Names are returned in first-seen order: every dosage hit first, then
/// list entries that were not already found.
pub fn extract_medicine_names(text: &str) -> Vec<ExtractedMedicine> {
    let mut medicines: Vec<ExtractedMedicine> = Vec::new();

    let passes = [
        (dosage_pattern(), DOSAGE_CONFIDENCE),
        (list_pattern(), LIST_CONFIDENCE),
    ];

    for (pattern, confidence) in passes {
        for caps in pattern.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let name = m.as_str().trim();

            if !is_candidate_name(name) {
                continue;
            }
            if medicines.iter().any(|existing| existing.name == name) {
                continue;
            }

            medicines.push(ExtractedMedicine {
                name: name.to_string(),
                confidence,
            });
        }
    }

    tracing::debug!("extracted {} medicine names", medicines.len());
    medicines
}

fn is_candidate_name(name: &str) -> bool {
    name.chars().count() > 2 && !STOP_WORDS.contains(&name)
}

/// Response shape of a vision service asked to list medicines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineResponse {
    pub medicines: Vec<ExtractedMedicine>,
}

/// Parse a vision-service JSON reply into extracted medicines.
///
/// Tolerates prose around the JSON object. Blank names are dropped and
/// confidences are clamped to 0..1.
pub fn parse_medicine_response(json: &str) -> ExtractionResult<Vec<ExtractedMedicine>> {
    let json_start = json.find('{').ok_or_else(|| {
        ExtractionError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = json.rfind('}').ok_or_else(|| {
        ExtractionError::InvalidFormat("No closing brace found in response".into())
    })?;
    if json_end < json_start {
        return Err(ExtractionError::InvalidFormat(
            "Closing brace precedes opening brace".into(),
        ));
    }

    let response: MedicineResponse = serde_json::from_str(&json[json_start..=json_end])?;

    Ok(response
        .medicines
        .into_iter()
        .filter(|m| !m.name.trim().is_empty())
        .map(|m| ExtractedMedicine {
            name: m.name.trim().to_string(),
            confidence: m.confidence.clamp(0.0, 1.0),
        })
        .collect())
}

/// Names of the extracted medicines, in order.
pub fn medicine_names(medicines: &[ExtractedMedicine]) -> Vec<String> {
    medicines.iter().map(|m| m.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESCRIPTION: &str = r#"
        Dr. John Smith, M.D.
        Patient: Jane Doe
        Rx:
        1. Paracetamol 500mg - Take 1 tablet twice daily
        2. Amoxicillin 250mg - Take 1 capsule three times daily for 7 days
        5. Vitamin D3 1000IU - Take 1 tablet daily
        Signature: Dr. John Smith
    "#;

    fn names(text: &str) -> Vec<String> {
        medicine_names(&extract_medicine_names(text))
    }

    #[test]
    fn test_dosage_pattern() {
        let found = names("Paracetamol 500mg twice daily");
        assert_eq!(found, vec!["Paracetamol"]);
    }

    #[test]
    fn test_dosage_pattern_two_words() {
        let found = names("Vitamin D3 1000IU");
        assert!(found.contains(&"Vitamin D3".to_string()));
    }

    #[test]
    fn test_prescription_sample() {
        let found = names(PRESCRIPTION);

        assert!(found.contains(&"Paracetamol".to_string()));
        assert!(found.contains(&"Amoxicillin".to_string()));
        assert!(found.contains(&"Vitamin D3".to_string()));
        // Numbered-list pass keeps the dose digits
        assert!(found.contains(&"Paracetamol 500".to_string()));

        assert!(!found.iter().any(|n| n == "Patient" || n == "Signature"));
    }

    #[test]
    fn test_dosage_hits_come_first() {
        let medicines = extract_medicine_names(PRESCRIPTION);
        assert_eq!(medicines[0].name, "Paracetamol");
        assert_eq!(medicines[0].confidence, DOSAGE_CONFIDENCE);

        let list_only = medicines
            .iter()
            .find(|m| m.name == "Paracetamol 500")
            .unwrap();
        assert_eq!(list_only.confidence, LIST_CONFIDENCE);
    }

    #[test]
    fn test_no_duplicates() {
        let found = names("Ibuprofen 400mg\nIbuprofen 200mg");
        assert_eq!(found, vec!["Ibuprofen"]);
    }

    #[test]
    fn test_short_and_stop_words_dropped() {
        assert!(names("Zn 50mg").is_empty());
        assert!(names("1. Take").is_empty());
    }

    #[test]
    fn test_no_medicines() {
        assert!(names("Follow up in two weeks.").is_empty());
        assert!(names("").is_empty());
    }

    #[test]
    fn test_parse_medicine_response() {
        let json = r#"{"medicines":[{"name":"Cetirizine","confidence":0.91}]}"#;
        let medicines = parse_medicine_response(json).unwrap();
        assert_eq!(medicines.len(), 1);
        assert_eq!(medicines[0].name, "Cetirizine");
    }

    #[test]
    fn test_parse_medicine_response_with_prose() {
        let json = r#"Here are the medicines I found:
{"medicines":[{"name":"  Ibuprofen ","confidence":1.7},{"name":" ","confidence":0.5}]}
Let me know if you need more."#;
        let medicines = parse_medicine_response(json).unwrap();
        assert_eq!(medicines.len(), 1);
        assert_eq!(medicines[0].name, "Ibuprofen");
        assert_eq!(medicines[0].confidence, 1.0);
    }

    #[test]
    fn test_parse_medicine_response_invalid() {
        assert!(matches!(
            parse_medicine_response("no json here"),
            Err(ExtractionError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_medicine_response("} {"),
            Err(ExtractionError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_medicine_response(r#"{"pills": []}"#),
            Err(ExtractionError::JsonParse(_))
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn prescription_line() -> impl Strategy<Value = String> {
            prop_oneof![
                "[A-Z][a-z]{0,10} [0-9]{1,4}(mg|mcg|ml|IU|g)",
                "[0-9]\\. [A-Z][a-z]{0,10}( [A-Z]?[0-9]{0,3})?",
                "(Take|tablet|capsule|Patient|Date|Signature) [0-9]{1,3}mg",
                "[ a-zA-Z0-9.:,-]{0,30}",
            ]
        }

        proptest! {
            #[test]
            fn extracted_names_are_clean(lines in prop::collection::vec(prescription_line(), 0..10)) {
                let text = lines.join("\n");
                let medicines = extract_medicine_names(&text);
                let names = medicine_names(&medicines);

                for (i, name) in names.iter().enumerate() {
                    prop_assert!(name.chars().count() > 2, "short name {:?}", name);
                    prop_assert_eq!(name.trim(), name.as_str());
                    prop_assert!(!STOP_WORDS.contains(&name.as_str()), "stop word {:?}", name);
                    prop_assert!(!names[..i].contains(name), "duplicate {:?}", name);
                }
                for medicine in &medicines {
                    prop_assert!(
                        medicine.confidence == DOSAGE_CONFIDENCE
                            || medicine.confidence == LIST_CONFIDENCE
                    );
                }
            }
        }
    }
}
