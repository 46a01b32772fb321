//! HTTP client for the OCR/translation backend

use base64::Engine;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::response::{AnalyzeOutcome, AnalyzeResponse, HistoryRecord};
use super::Detection;
use crate::config::{BackendConfig, UploadMode};

const ANALYZE_PATH: &str = "/api/analyze-text";
const HISTORY_PATH: &str = "/api/get_all_cards";

/// OCR backend errors
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Backend returned status {0}: {1}")]
    Status(u16, String),

    #[error("Backend reported an error: {0}")]
    Backend(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for OcrError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OcrError::Timeout
        } else if e.is_decode() {
            OcrError::MalformedResponse(e.to_string())
        } else {
            OcrError::Network(e.to_string())
        }
    }
}

/// A captured image ready to be sent to the backend
#[derive(Debug, Clone)]
pub struct UploadPayload {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// Content-derived file name, e.g. `capture_3f2a9c01b7de.jpg`
    pub file_name: String,
    /// MIME type sniffed from the bytes
    pub mime: &'static str,
}

impl UploadPayload {
    /// Wrap raw image bytes, naming the upload after their SHA-256 digest
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let (extension, mime) = match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => ("png", "image/png"),
            Ok(ImageFormat::WebP) => ("webp", "image/webp"),
            Ok(ImageFormat::Bmp) => ("bmp", "image/bmp"),
            Ok(ImageFormat::Gif) => ("gif", "image/gif"),
            _ => ("jpg", "image/jpeg"),
        };

        let hash = format!("{:x}", Sha256::digest(&bytes));
        let file_name = format!("capture_{}.{}", &hash[..12], extension);

        Self {
            bytes,
            file_name,
            mime,
        }
    }
}

/// Client for the analyze and history endpoints
pub struct OcrClient {
    http_client: reqwest::Client,
    base_url: String,
    upload_mode: UploadMode,
}

impl OcrClient {
    /// Create a client from backend settings
    pub fn new(config: &BackendConfig) -> Result<Self, OcrError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| OcrError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_mode: config.upload_mode,
        })
    }

    /// Backend base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload an image and interpret the analysis result
    pub async fn analyze(&self, payload: &UploadPayload) -> Result<AnalyzeOutcome, OcrError> {
        let url = format!("{}{}", self.base_url, ANALYZE_PATH);

        debug!(
            url = %url,
            file = %payload.file_name,
            size = payload.bytes.len(),
            mode = ?self.upload_mode,
            "Uploading capture to OCR backend"
        );

        let request = match self.upload_mode {
            UploadMode::Multipart => {
                let part = reqwest::multipart::Part::bytes(payload.bytes.clone())
                    .file_name(payload.file_name.clone())
                    .mime_str(payload.mime)?;
                let form = reqwest::multipart::Form::new().part("file", part);
                self.http_client.post(&url).multipart(form)
            }
            UploadMode::Base64 => {
                let body = serde_json::json!({
                    "image_base64": base64::engine::general_purpose::STANDARD.encode(&payload.bytes),
                    "filename": payload.file_name,
                });
                self.http_client.post(&url).json(&body)
            }
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "OCR backend rejected upload");
            return Err(OcrError::Status(status.as_u16(), error_text));
        }

        let body: AnalyzeResponse = response.json().await?;
        let outcome = body.into_outcome()?;

        if let AnalyzeOutcome::Detected { detection, .. } = &outcome {
            info!(
                source_id = ?detection.source_id,
                original = %detection.original_text,
                translated = %detection.translated_text,
                "OCR backend detected text"
            );
        }

        Ok(outcome)
    }

    /// Fetch previously stored detections, oldest first as the backend lists them
    pub async fn history(&self) -> Result<Vec<Detection>, OcrError> {
        let url = format!("{}{}", self.base_url, HISTORY_PATH);
        debug!(url = %url, "Fetching detection history");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OcrError::Status(status.as_u16(), error_text));
        }

        let body: serde_json::Value = response.json().await?;
        let detections = parse_history(body)?;

        info!("Loaded {} detections from history", detections.len());
        Ok(detections)
    }
}

/// Interpret a history body, skipping records that carry no text
fn parse_history(body: serde_json::Value) -> Result<Vec<Detection>, OcrError> {
    let records: Vec<HistoryRecord> = match body {
        serde_json::Value::Array(_) => serde_json::from_value(body)
            .map_err(|e| OcrError::MalformedResponse(e.to_string()))?,
        serde_json::Value::Object(ref map) if map.contains_key("error") => {
            return Err(OcrError::Backend(map["error"].to_string()));
        }
        serde_json::Value::Null => Vec::new(),
        other => {
            return Err(OcrError::MalformedResponse(format!(
                "expected an array of records, got {}",
                other
            )));
        }
    };

    let total = records.len();
    let detections: Vec<Detection> = records
        .into_iter()
        .filter_map(HistoryRecord::into_detection)
        .collect();

    if detections.len() < total {
        warn!(
            "Skipped {} history records without text",
            total - detections.len()
        );
    }

    Ok(detections)
}
