//! Shared types flowing through the two-stage analysis pipeline.

use std::fmt;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// One food item extracted from a photo, validated and ready for the caller.
///
/// Invariants (enforced by the sanitizer, not by construction): all masses
/// and energies are non-negative, `mass_grams` is positive, and the sum of
/// macro-nutrient masses does not exceed `mass_grams` times the configured
/// tolerance factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub name: String,
    pub mass_grams: f64,
    pub energy_kcal: f64,
    pub protein_grams: f64,
    pub carb_grams: f64,
    pub fat_grams: f64,
    pub water_grams: f64,
}

/// Stage-1 verdict: proceed to extraction or stop.
///
/// Produced exactly once per image; the gate never retries.
#[derive(Debug, Clone)]
pub struct ClassificationVerdict {
    pub is_valid_subject: bool,
    /// What the gate believes the image shows (food or otherwise).
    pub subject_label: Option<String>,
    /// Set only when `is_valid_subject` is false.
    pub reject_reason: Option<String>,
}

impl ClassificationVerdict {
    /// Accepting verdict with no further detail — the fail-open default.
    pub fn accept() -> Self {
        Self {
            is_valid_subject: true,
            subject_label: None,
            reject_reason: None,
        }
    }
}

/// Normalized reply from any provider dialect: the model's text plus the
/// HTTP status it arrived with.
#[derive(Debug, Clone)]
pub struct RawProviderResponse {
    pub raw_text: String,
    pub http_status: u16,
}

/// Image handed to the pipeline. Bytes are base64-encoded lazily when a
/// provider request body is built.
#[derive(Clone)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// JPEG payload — the common case for phone camera captures.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "image/jpeg")
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 encoding of the raw bytes, as provider bodies expect.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Successful result of a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub items: Vec<ExtractedItem>,
    /// Aggregate confidence in [0, 1]: minimum of provider confidence and
    /// the weakest per-item confidence.
    pub confidence: f32,
    /// Which provider produced the accepted payload.
    pub provider_id: String,
}
