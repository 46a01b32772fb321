//! Transient status messages shown after a capture

use std::time::{Duration, Instant};

/// Outcome category of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Image uploaded and text detected
    Success,
    /// Image uploaded but the backend found no text
    NoTextDetected,
    /// Upload or transport failed
    UploadError,
    /// Backend answered with something we could not use
    InvalidResponse,
}

impl StatusKind {
    /// Default text for this kind
    pub fn default_text(&self) -> &'static str {
        match self {
            StatusKind::Success => "Image uploaded and text detected",
            StatusKind::NoTextDetected => "Image uploaded but no text was detected",
            StatusKind::UploadError => "Error uploading the image",
            StatusKind::InvalidResponse => "The OCR service returned an invalid response",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatusKind::UploadError | StatusKind::InvalidResponse)
    }
}

/// A status message that dismisses itself after a fixed interval
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    expires_at: Instant,
}

impl StatusMessage {
    /// Create a message with the kind's default text
    pub fn new(kind: StatusKind, dismiss_after: Duration) -> Self {
        Self::with_text(kind, kind.default_text(), dismiss_after)
    }

    pub fn with_text(kind: StatusKind, text: impl Into<String>, dismiss_after: Duration) -> Self {
        Self {
            kind,
            text: text.into(),
            expires_at: Instant::now() + dismiss_after,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
