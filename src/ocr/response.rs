//! Wire formats returned by the OCR backend

use serde::Deserialize;

use super::{DetectedText, Detection, OcrError, TextKind};

/// Body of `POST /api/analyze-text`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    /// Human-readable status from the backend
    #[serde(default)]
    pub message: Option<String>,
    /// Present when the backend failed to analyze the image
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    /// Stored file name of the uploaded image
    #[serde(default)]
    pub file: Option<String>,
    /// Key of the stored analysis result
    #[serde(default)]
    pub result_key: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub translated_text: Option<String>,
    /// Raw text regions, when the backend includes them
    #[serde(default)]
    pub detected_texts: Option<Vec<DetectedText>>,
}

/// Result of interpreting an analyze response
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeOutcome {
    /// The image produced a usable detection
    Detected {
        detection: Detection,
        detected_texts: Vec<DetectedText>,
    },
    /// The image was accepted but no text was found on it
    NoText,
}

impl AnalyzeResponse {
    /// Source identifier for the capture
    ///
    /// The result key is what the history endpoint reports as `file`, so it
    /// wins over the uploaded file name.
    pub fn source_id(&self) -> Option<String> {
        [&self.result_key, &self.file]
            .into_iter()
            .flatten()
            .find(|id| !id.trim().is_empty())
            .cloned()
    }

    /// Turn the raw response into a detection, rejecting error or malformed bodies
    pub fn into_outcome(self) -> Result<AnalyzeOutcome, OcrError> {
        if let Some(error) = &self.error {
            let message = match error {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(OcrError::Backend(message));
        }

        let source_id = self.source_id();

        match (self.original_text, self.translated_text) {
            (Some(original_text), translated_text) => {
                let translated_text = translated_text.unwrap_or_else(|| original_text.clone());
                let detection = Detection {
                    source_id,
                    original_text,
                    translated_text,
                };
                if detection.is_blank() {
                    return Ok(AnalyzeOutcome::NoText);
                }
                Ok(AnalyzeOutcome::Detected {
                    detection,
                    detected_texts: self.detected_texts.unwrap_or_default(),
                })
            }
            // Plain OCR responses only carry the detected regions
            (None, _) => match self.detected_texts {
                Some(texts) => match first_line(&texts) {
                    Some(line) => Ok(AnalyzeOutcome::Detected {
                        detection: Detection {
                            source_id,
                            original_text: line.clone(),
                            translated_text: line,
                        },
                        detected_texts: texts,
                    }),
                    None => Ok(AnalyzeOutcome::NoText),
                },
                None => Err(OcrError::MalformedResponse(
                    "response has neither original_text nor detected_texts".to_string(),
                )),
            },
        }
    }
}

/// Text of the first non-blank line region, falling back to the first word
fn first_line(texts: &[DetectedText]) -> Option<String> {
    let non_blank = |text: &&DetectedText| !text.text.trim().is_empty();
    texts
        .iter()
        .filter(non_blank)
        .find(|text| text.kind == TextKind::Line)
        .or_else(|| texts.iter().find(non_blank))
        .map(|text| text.text.trim().to_string())
}

/// One entry of `GET /api/get_all_cards`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub translated_text: Option<String>,
    /// Older backends only stored the first detected line
    #[serde(default)]
    pub text: Option<String>,
}

impl HistoryRecord {
    /// Convert to a detection; `None` when the record carries no text at all
    pub fn into_detection(self) -> Option<Detection> {
        let original_text = self.original_text.or(self.text)?;
        let translated_text = self
            .translated_text
            .unwrap_or_else(|| original_text.clone());

        Some(Detection {
            source_id: self.file.filter(|f| !f.trim().is_empty()),
            original_text,
            translated_text,
        })
    }
}
