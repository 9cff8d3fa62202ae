//! Prescription upload pipeline.
//!
//! Pipeline: Image → OCR text → Medicine names → Catalog matching

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::{MatcherConfig, MedicineMatcher, ProductSearch};
use crate::models::MatchResult;
use medicom_extract::{extract_medicine_names, ExtractedMedicine, ExtractionError, TextExtractor};

/// Pipeline errors. Per-name search failures are not errors; they end up
/// in the result's `not_found` list.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Everything produced by one upload attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionOutcome {
    pub extracted_text: String,
    pub medicines: Vec<ExtractedMedicine>,
    pub result: MatchResult,
}

impl PrescriptionOutcome {
    /// True when the text contained no recognisable medicine names.
    pub fn no_medicines_detected(&self) -> bool {
        self.medicines.is_empty()
    }
}

pub struct PrescriptionPipeline<'a, E: TextExtractor + ?Sized, S: ProductSearch + ?Sized> {
    extractor: &'a E,
    matcher: MedicineMatcher<'a, S>,
}

impl<'a, E: TextExtractor + ?Sized, S: ProductSearch + ?Sized> PrescriptionPipeline<'a, E, S> {
    pub fn new(extractor: &'a E, search: &'a S) -> Self {
        Self::with_config(extractor, search, MatcherConfig::default())
    }

    pub fn with_config(extractor: &'a E, search: &'a S, config: MatcherConfig) -> Self {
        Self {
            extractor,
            matcher: MedicineMatcher::with_config(search, config),
        }
    }

    /// Run OCR on an uploaded image, then match the medicines it names.
    pub fn process_image(&self, image: &[u8]) -> Result<PrescriptionOutcome, PipelineError> {
        let text = self.extractor.extract(image)?;
        Ok(self.process_text(text))
    }

    /// Match the medicines named in already-extracted prescription text.
    pub fn process_text(&self, text: String) -> PrescriptionOutcome {
        let medicines = extract_medicine_names(&text);
        if medicines.is_empty() {
            tracing::info!("no medicines detected in prescription text");
        }
        let result = self.matcher.match_extracted(&medicines);

        PrescriptionOutcome {
            extracted_text: text,
            medicines,
            result,
        }
    }
}
