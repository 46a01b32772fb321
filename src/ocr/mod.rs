//! OCR/Translation Backend Layer
//!
//! Talks to the external OCR service that receives captured card photos and
//! returns the recognized text together with its English translation.
//! Every successful analysis becomes one [`Detection`] for the reconciler.

pub mod client;
pub mod response;

use serde::{Deserialize, Serialize};

pub use client::{OcrClient, OcrError, UploadPayload};
pub use response::{AnalyzeOutcome, AnalyzeResponse, HistoryRecord};

/// One OCR + translation result for a captured image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Detection {
    /// Identifier of the originating capture (backend result key or file name)
    pub source_id: Option<String>,
    /// Raw text as recognized in the card's printed language
    pub original_text: String,
    /// Backend translation of `original_text` (usually English)
    pub translated_text: String,
}

impl Detection {
    /// Create a detection tagged with a source identifier
    pub fn new(
        source_id: impl Into<String>,
        original_text: impl Into<String>,
        translated_text: impl Into<String>,
    ) -> Self {
        Self {
            source_id: Some(source_id.into()),
            original_text: original_text.into(),
            translated_text: translated_text.into(),
        }
    }

    /// Create a detection with no source identifier
    pub fn untagged(original_text: impl Into<String>, translated_text: impl Into<String>) -> Self {
        Self {
            source_id: None,
            original_text: original_text.into(),
            translated_text: translated_text.into(),
        }
    }

    /// True when neither text carries anything but whitespace
    pub fn is_blank(&self) -> bool {
        self.original_text.trim().is_empty() && self.translated_text.trim().is_empty()
    }
}

/// Granularity reported by the OCR service for a text region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TextKind {
    /// Full line of text
    #[default]
    Line,
    /// Single word
    Word,
}

/// Raw text region as reported by the OCR service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedText {
    /// Detected text content
    #[serde(rename = "Text")]
    pub text: String,
    /// Confidence score (0 - 100)
    #[serde(rename = "Confidence", default)]
    pub confidence: f32,
    /// Line or word
    #[serde(rename = "Type", default)]
    pub kind: TextKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_constructors() {
        let tagged = Detection::new("a", "Sol Ring.", "Sol Ring");
        assert_eq!(tagged.source_id.as_deref(), Some("a"));

        let untagged = Detection::untagged("Rayo", "Lightning Bolt");
        assert!(untagged.source_id.is_none());
    }

    #[test]
    fn test_blank_detection() {
        assert!(Detection::untagged("", "  ").is_blank());
        assert!(!Detection::untagged("", "Sol Ring").is_blank());
    }

    #[test]
    fn test_detected_text_wire_names() {
        let json = r#"{"Text": "Rayo", "Confidence": 98.5, "Type": "WORD"}"#;
        let text: DetectedText = serde_json::from_str(json).unwrap();
        assert_eq!(text.text, "Rayo");
        assert_eq!(text.kind, TextKind::Word);
        assert!((text.confidence - 98.5).abs() < 0.01);
    }
}
