//! Application Coordinator
//!
//! Wires the OCR backend, the card lookup and the reconciler into one
//! scanning session, and turns capture outcomes into status messages.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::collection::{CollectionSnapshot, DisplayState, IngestReport, Reconciler, SessionHandle};
use crate::config::AppConfig;
use crate::lookup::{CardLookup, ScryfallClient};
use crate::ocr::{AnalyzeOutcome, DetectedText, OcrClient, OcrError, UploadPayload};
use crate::shared::{StatusBoard, StatusKind, StatusMessage};

/// What happened to one captured image
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Text was detected and handed to the reconciler
    Detected {
        detected_texts: Vec<DetectedText>,
        report: IngestReport,
    },
    /// The backend found no text on the image
    NoText,
    /// The backend's answer was rejected before reaching the reconciler
    Rejected(OcrError),
    /// The upload itself failed
    Failed(OcrError),
}

/// One scanning session
pub struct CardLensApp<L> {
    ocr: OcrClient,
    reconciler: Arc<Reconciler<L>>,
    status: StatusBoard,
}

impl CardLensApp<ScryfallClient> {
    /// Create a session backed by the Scryfall API
    pub fn new(config: &AppConfig) -> Result<Self> {
        let lookup = ScryfallClient::new(&config.lookup).context("Failed to create lookup client")?;
        Self::with_lookup(config, lookup)
    }
}

impl<L: CardLookup> CardLensApp<L> {
    /// Create a session with a custom card lookup
    pub fn with_lookup(config: &AppConfig, lookup: L) -> Result<Self> {
        let ocr = OcrClient::new(&config.backend).context("Failed to create OCR client")?;

        info!(backend = %ocr.base_url(), "Scanning session ready");

        Ok(Self {
            ocr,
            reconciler: Arc::new(Reconciler::new(lookup)),
            status: StatusBoard::new(Duration::from_millis(config.status.dismiss_after_ms)),
        })
    }

    /// Seed the collection from the backend's stored detections
    pub async fn load_history(&self) -> Result<IngestReport, OcrError> {
        let detections = self.ocr.history().await?;
        Ok(self.reconciler.ingest_history(detections).await)
    }

    /// Upload an image file and reconcile its detection
    pub async fn capture_file(&self, path: &Path) -> Result<CaptureOutcome> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {:?}", path))?;
        Ok(self.capture(UploadPayload::from_bytes(bytes)).await)
    }

    /// Upload a captured image and reconcile its detection
    pub async fn capture(&self, payload: UploadPayload) -> CaptureOutcome {
        match self.ocr.analyze(&payload).await {
            Ok(AnalyzeOutcome::Detected {
                detection,
                detected_texts,
            }) => {
                self.status.post(StatusKind::Success);
                let report = self.reconciler.ingest(vec![detection]).await;
                CaptureOutcome::Detected {
                    detected_texts,
                    report,
                }
            }
            Ok(AnalyzeOutcome::NoText) => {
                self.status.post(StatusKind::NoTextDetected);
                CaptureOutcome::NoText
            }
            Err(e @ (OcrError::Backend(_) | OcrError::MalformedResponse(_))) => {
                warn!(file = %payload.file_name, error = %e, "Rejected OCR response");
                self.status.post(StatusKind::InvalidResponse);
                CaptureOutcome::Rejected(e)
            }
            Err(e) => {
                warn!(file = %payload.file_name, error = %e, "Upload failed");
                self.status.post(StatusKind::UploadError);
                CaptureOutcome::Failed(e)
            }
        }
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        self.reconciler.snapshot()
    }

    pub fn display_state(&self) -> DisplayState {
        self.reconciler.display_state()
    }

    /// Current status message, if one is still visible
    pub fn status(&self) -> Option<StatusMessage> {
        self.status.current()
    }

    /// Handle for tearing the session down from another task
    pub fn session_handle(&self) -> SessionHandle {
        self.reconciler.handle()
    }
}

impl<L> Drop for CardLensApp<L> {
    fn drop(&mut self) {
        // In-flight lookups finish on their own but their results are dropped
        self.reconciler.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::EnrichmentResult;
    use crate::matching::testing::ScriptedLookup;
    use httpmock::prelude::*;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        // Nothing listens on the discard port
        config.backend.base_url = "http://127.0.0.1:9".to_string();
        config.backend.timeout_ms = 2000;
        config
    }

    #[test]
    fn test_app_creation() {
        let app = CardLensApp::with_lookup(&offline_config(), ScriptedLookup::new());
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn test_new_session_is_empty() {
        let app = CardLensApp::with_lookup(&offline_config(), ScriptedLookup::new()).unwrap();

        assert_eq!(app.display_state(), DisplayState::Empty);
        assert!(app.snapshot().is_empty());
        assert!(app.status().is_none());
    }

    #[tokio::test]
    async fn test_missing_image_file_is_error() {
        let app = CardLensApp::with_lookup(&offline_config(), ScriptedLookup::new()).unwrap();
        let result = app.capture_file(Path::new("/nonexistent/card.jpg")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_backend_posts_upload_error() {
        let lookup = ScriptedLookup::new();
        let app = CardLensApp::with_lookup(&offline_config(), lookup.clone()).unwrap();

        let outcome = app.capture(UploadPayload::from_bytes(vec![0xFF, 0xD8, 0xFF])).await;

        assert!(matches!(outcome, CaptureOutcome::Failed(_)));
        assert_eq!(app.status().unwrap().kind, StatusKind::UploadError);
        assert!(app.snapshot().is_empty());
        assert!(lookup.queries().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_app_disposes_session() {
        let app = CardLensApp::with_lookup(&offline_config(), ScriptedLookup::new()).unwrap();
        let handle = app.session_handle();

        drop(app);
        assert!(handle.is_disposed());
    }

    // ── Backend round trips (httpmock) ──────────────────────────────

    fn mock_config(server: &MockServer) -> AppConfig {
        let mut config = AppConfig::default();
        config.backend.base_url = server.base_url();
        config
    }

    fn sol_ring_lookup() -> ScriptedLookup {
        ScriptedLookup::new().with_card(
            "Sol Ring",
            EnrichmentResult::new("Sol Ring", "https://img/sol-ring.jpg"),
        )
    }

    #[tokio::test]
    async fn test_capture_reaches_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/analyze-text");
                then.status(200).json_body(serde_json::json!({
                    "message": "Texto detectado correctamente",
                    "detected_texts": [{"Text": "Sol Ring", "Confidence": 99.2, "Type": "LINE"}],
                    "result_key": "result_capture_ab.json"
                }));
            })
            .await;

        let lookup = sol_ring_lookup();
        let app = CardLensApp::with_lookup(&mock_config(&server), lookup.clone()).unwrap();

        let outcome = app.capture(UploadPayload::from_bytes(b"photo".to_vec())).await;
        match outcome {
            CaptureOutcome::Detected { report, .. } => assert_eq!(report.merged, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(app.status().unwrap().kind, StatusKind::Success);
        assert_eq!(app.display_state(), DisplayState::Populated);
        let snapshot = app.snapshot();
        let entry = snapshot.get(0).unwrap();
        assert_eq!(entry.detection.source_id.as_deref(), Some("result_capture_ab.json"));
        assert_eq!(entry.display_name(), "Sol Ring");

        // Same result key again: already processed, no second lookup
        let again = app.capture(UploadPayload::from_bytes(b"photo".to_vec())).await;
        assert!(matches!(again, CaptureOutcome::Detected { report, .. } if report.selected == 0));
        assert_eq!(lookup.queries(), vec!["Sol Ring"]);
        assert_eq!(app.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_error_never_claims_source_id() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/analyze-text");
                then.status(200).json_body(serde_json::json!({
                    "error": "No se pudo procesar la imagen",
                    "result_key": "result_capture_ab.json",
                    "original_text": "Sol Ring"
                }));
            })
            .await;

        let lookup = sol_ring_lookup();
        let app = CardLensApp::with_lookup(&mock_config(&server), lookup.clone()).unwrap();

        let outcome = app.capture(UploadPayload::from_bytes(b"photo".to_vec())).await;

        assert!(matches!(outcome, CaptureOutcome::Rejected(OcrError::Backend(_))));
        assert_eq!(app.status().unwrap().kind, StatusKind::InvalidResponse);
        assert!(app.snapshot().is_empty());
        assert!(!app.reconciler.is_processed("result_capture_ab.json"));
        assert_eq!(app.reconciler.processed_count(), 0);
        assert!(lookup.queries().is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_status_posts_upload_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/analyze-text");
                then.status(500)
                    .json_body(serde_json::json!({"error": "No se pudo procesar la imagen"}));
            })
            .await;

        let app = CardLensApp::with_lookup(&mock_config(&server), sol_ring_lookup()).unwrap();
        let outcome = app.capture(UploadPayload::from_bytes(b"photo".to_vec())).await;

        assert!(matches!(outcome, CaptureOutcome::Failed(OcrError::Status(500, _))));
        assert_eq!(app.status().unwrap().kind, StatusKind::UploadError);
        assert_eq!(app.reconciler.processed_count(), 0);
    }

    #[tokio::test]
    async fn test_no_text_posts_status_without_ingest() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/analyze-text");
                then.status(200).json_body(serde_json::json!({
                    "message": "No se detectó texto",
                    "detected_texts": [],
                    "result_key": "result_capture_cd.json"
                }));
            })
            .await;

        let app = CardLensApp::with_lookup(&mock_config(&server), sol_ring_lookup()).unwrap();
        let outcome = app.capture(UploadPayload::from_bytes(b"blank".to_vec())).await;

        assert!(matches!(outcome, CaptureOutcome::NoText));
        assert_eq!(app.status().unwrap().kind, StatusKind::NoTextDetected);
        assert_eq!(app.display_state(), DisplayState::Empty);
        assert_eq!(app.reconciler.processed_count(), 0);
    }

    #[tokio::test]
    async fn test_history_then_live_capture() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/get_all_cards");
                then.status(200).json_body(serde_json::json!([
                    {"file": "result_a.json", "original_text": "Rayo", "translated_text": "Lightning Bolt"},
                    {"file": "result_capture_ab.json", "original_text": "Sol Ring", "translated_text": "Sol Ring"}
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/analyze-text");
                then.status(200).json_body(serde_json::json!({
                    "detected_texts": [{"Text": "Sol Ring", "Confidence": 99.2, "Type": "LINE"}],
                    "result_key": "result_capture_ab.json"
                }));
            })
            .await;

        let lookup = sol_ring_lookup();
        let app = CardLensApp::with_lookup(&mock_config(&server), lookup.clone()).unwrap();

        let report = app.load_history().await.unwrap();
        assert_eq!(report.merged, 2);

        // The live capture of an image already in history is skipped
        let outcome = app.capture(UploadPayload::from_bytes(b"photo".to_vec())).await;
        assert!(matches!(outcome, CaptureOutcome::Detected { report, .. } if report.selected == 0));

        let names: Vec<String> = app
            .snapshot()
            .iter()
            .map(|entry| entry.detection.original_text.clone())
            .collect();
        assert_eq!(names, vec!["Rayo", "Sol Ring"]);
    }
}
