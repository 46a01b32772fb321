//! Runtime state shared between the capture flow and the presentation layer

use parking_lot::RwLock;
use std::time::Duration;

use super::messages::{StatusKind, StatusMessage};

/// Holds the current status message, replacing it on every capture
#[derive(Debug)]
pub struct StatusBoard {
    current: RwLock<Option<StatusMessage>>,
    dismiss_after: Duration,
}

impl StatusBoard {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            dismiss_after,
        }
    }

    /// Show a message with the kind's default text
    pub fn post(&self, kind: StatusKind) {
        self.post_text(kind, kind.default_text());
    }

    pub fn post_text(&self, kind: StatusKind, text: impl Into<String>) {
        *self.current.write() = Some(StatusMessage::with_text(kind, text, self.dismiss_after));
    }

    /// Current message, or `None` once it has been dismissed
    pub fn current(&self) -> Option<StatusMessage> {
        let mut current = self.current.write();
        if current.as_ref().is_some_and(|m| m.is_expired()) {
            *current = None;
        }
        current.clone()
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }
}
