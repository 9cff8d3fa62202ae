//! Prescription text extraction for medicom.
//!
//! This crate sits at the OCR boundary: it validates uploaded prescription
//! images, hands them to a [`TextExtractor`], and turns the raw text into a
//! list of [`ExtractedMedicine`] guesses for the catalog matcher.

pub mod extraction;
pub mod ocr;

pub use extraction::*;
pub use ocr::*;
