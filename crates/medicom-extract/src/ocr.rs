//! OCR boundary: upload validation and text extractors.

use crate::extraction::{ExtractionError, ExtractionResult};

/// Largest accepted prescription upload (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image formats accepted for prescription uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
}

impl ImageFormat {
    /// Detect the format from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else {
            None
        }
    }

    /// MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Check that an upload is a non-empty image within the size limit.
pub fn validate_image(bytes: &[u8]) -> ExtractionResult<ImageFormat> {
    if bytes.is_empty() {
        return Err(ExtractionError::InvalidUpload("upload is empty".into()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ExtractionError::InvalidUpload(format!(
            "upload is {} bytes, limit is {}",
            bytes.len(),
            MAX_UPLOAD_BYTES
        )));
    }
    ImageFormat::sniff(bytes).ok_or_else(|| {
        ExtractionError::InvalidUpload("upload is not a JPEG, PNG, GIF, WEBP or BMP image".into())
    })
}

/// Turns a prescription image into raw text.
///
/// Implementations wrap a real OCR or vision service.
pub trait TextExtractor {
    fn extract(&self, image: &[u8]) -> ExtractionResult<String>;
}

/// Stand-in OCR that always reads the same sample prescription.
#[derive(Debug, Default, Clone)]
pub struct SimulatedOcr;

impl SimulatedOcr {
    pub fn new() -> Self {
        Self
    }

    /// The sample prescription text, dated today.
    pub fn sample_text() -> String {
        let date = chrono::Local::now().format("%m/%d/%Y");
        format!(
            r#"
          Dr. John Smith, M.D.
          Medical Center Hospital

          Patient: Jane Doe
          Date: {date}

          Rx:
          1. Paracetamol 500mg - Take 1 tablet twice daily
          2. Amoxicillin 250mg - Take 1 capsule three times daily for 7 days
          3. Ibuprofen 400mg - Take as needed for pain
          4. Cetirizine 10mg - Take 1 tablet once daily
          5. Vitamin D3 1000IU - Take 1 tablet daily

          Signature: Dr. John Smith
        "#
        )
    }
}

impl TextExtractor for SimulatedOcr {
    fn extract(&self, image: &[u8]) -> ExtractionResult<String> {
        let format = validate_image(image)?;
        tracing::debug!("simulated OCR on {} upload ({} bytes)", format.mime_type(), image.len());
        Ok(Self::sample_text())
    }
}
