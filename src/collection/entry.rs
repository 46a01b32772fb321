//! Collection entries and read-only snapshots

use serde::Serialize;
use std::sync::Arc;

use crate::lookup::EnrichmentResult;
use crate::matching::{MatchStatus, Resolution};
use crate::ocr::Detection;

/// A detection together with its lookup outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionEntry {
    pub detection: Detection,
    pub enrichment: Option<EnrichmentResult>,
    pub status: MatchStatus,
}

impl CollectionEntry {
    pub fn new(detection: Detection, resolution: Resolution) -> Self {
        Self {
            detection,
            enrichment: resolution.enrichment,
            status: resolution.status,
        }
    }

    /// Whether this entry represents the same capture as `detection`
    pub fn is_same_capture(&self, detection: &Detection) -> bool {
        self.detection.source_id == detection.source_id
            && self.detection.original_text == detection.original_text
    }

    /// Canonical card name if matched, otherwise the raw OCR text
    pub fn display_name(&self) -> &str {
        self.enrichment
            .as_ref()
            .map(|card| card.canonical_name.as_str())
            .unwrap_or(&self.detection.original_text)
    }

    pub fn is_matched(&self) -> bool {
        self.enrichment.is_some()
    }
}

/// Immutable view of the collection, most recent entry first
///
/// Cloning is cheap and iteration can be restarted any number of times;
/// later ingests never change an existing snapshot.
#[derive(Debug, Clone, Default)]
pub struct CollectionSnapshot {
    entries: Arc<Vec<CollectionEntry>>,
}

impl CollectionSnapshot {
    pub(crate) fn new(entries: Arc<Vec<CollectionEntry>>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollectionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CollectionEntry> {
        self.entries.get(index)
    }

    /// Number of entries with a matched card
    pub fn matched_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_matched()).count()
    }
}

impl<'a> IntoIterator for &'a CollectionSnapshot {
    type Item = &'a CollectionEntry;
    type IntoIter = std::slice::Iter<'a, CollectionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
