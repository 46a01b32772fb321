//! Collection Reconciler
//!
//! Owns the deduplicated card collection for one scanning session. Incoming
//! detections are filtered against the set of already-dispatched source ids,
//! resolved one at a time, and merged most-recent-first.
//!
//! Only one resolution runs at a time per reconciler, even when several
//! callers ingest concurrently. State is never locked across an `.await`.

pub mod entry;

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::lookup::CardLookup;
use crate::matching::{MatchResolver, MatchStatus};
use crate::ocr::Detection;

pub use entry::{CollectionEntry, CollectionSnapshot};

/// Where merged entries are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergePosition {
    /// Live captures: most recent first
    Front,
    /// History seeding: keep the order the records arrived in
    Back,
}

/// What the collection view should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// Nothing collected and nothing in flight
    Empty,
    /// A batch is being resolved and nothing is collected yet
    Searching,
    /// At least one entry is available
    Populated,
}

impl DisplayState {
    /// Placeholder text for states without entries
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            DisplayState::Empty => Some("No cards matched yet"),
            DisplayState::Searching => Some("Searching for cards..."),
            DisplayState::Populated => None,
        }
    }
}

/// Counts from one ingest call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Detections that passed the dedup filter
    pub selected: usize,
    /// Entries added to the collection
    pub merged: usize,
    /// Resolved detections dropped because an identical entry existed
    pub duplicates: usize,
    /// Entries added without a matched card
    pub unmatched: usize,
    /// The session was disposed before the batch finished
    pub cancelled: bool,
}

/// Cloneable handle used to tear a session down from outside
#[derive(Debug, Clone)]
pub struct SessionHandle {
    token: CancellationToken,
}

impl SessionHandle {
    /// Mark the session dead; in-flight results are discarded
    pub fn dispose(&self) {
        self.token.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct CollectionState {
    /// Source ids already dispatched; only ever grows
    processed: HashSet<String>,
    /// Most recent first
    entries: Arc<Vec<CollectionEntry>>,
}

/// Keeps the searching counter in step even if an ingest future is dropped
struct SearchingGuard<'a>(&'a AtomicUsize);

impl<'a> SearchingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for SearchingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stateful reconciler merging detections into a duplicate-free collection
pub struct Reconciler<L> {
    session_id: Uuid,
    resolver: MatchResolver<L>,
    state: RwLock<CollectionState>,
    /// Serialises batches so only one resolution is in flight
    batch_gate: tokio::sync::Mutex<()>,
    /// Batches selected but not yet finished
    searching: AtomicUsize,
    token: CancellationToken,
}

impl<L: CardLookup> Reconciler<L> {
    /// Start an empty session on top of a card lookup
    pub fn new(lookup: L) -> Self {
        let session_id = Uuid::new_v4();
        info!(session = %session_id, "Reconciler session started");

        Self {
            session_id,
            resolver: MatchResolver::new(lookup),
            state: RwLock::new(CollectionState::default()),
            batch_gate: tokio::sync::Mutex::new(()),
            searching: AtomicUsize::new(0),
            token: CancellationToken::new(),
        }
    }

    /// Ingest live detections; new entries go to the top of the collection
    pub async fn ingest(&self, batch: Vec<Detection>) -> IngestReport {
        self.ingest_at(batch, MergePosition::Front).await
    }

    /// Seed the collection from stored history, keeping the history's order
    ///
    /// Uses the same dedup and merge rules as [`Reconciler::ingest`].
    pub async fn ingest_history(&self, records: Vec<Detection>) -> IngestReport {
        self.ingest_at(records, MergePosition::Back).await
    }

    async fn ingest_at(&self, batch: Vec<Detection>, position: MergePosition) -> IngestReport {
        let mut report = IngestReport::default();

        if !self.is_live() {
            debug!(session = %self.session_id, "Ignoring batch for disposed session");
            report.cancelled = true;
            return report;
        }

        let selected = self.select_new(batch);
        report.selected = selected.len();
        if selected.is_empty() {
            return report;
        }

        let _searching = SearchingGuard::enter(&self.searching);
        let _gate = self.batch_gate.lock().await;

        debug!(
            session = %self.session_id,
            count = selected.len(),
            "Resolving batch"
        );

        for detection in selected {
            if !self.is_live() {
                report.cancelled = true;
                break;
            }

            let resolution = self.resolver.resolve_detailed(&detection).await;

            if !self.is_live() {
                debug!(
                    session = %self.session_id,
                    source_id = ?detection.source_id,
                    "Discarding result for disposed session"
                );
                report.cancelled = true;
                break;
            }

            let unmatched = resolution.status != MatchStatus::Matched;
            if self.merge(CollectionEntry::new(detection, resolution), position) {
                report.merged += 1;
                if unmatched {
                    report.unmatched += 1;
                }
            } else {
                report.duplicates += 1;
            }
        }

        info!(
            session = %self.session_id,
            selected = report.selected,
            merged = report.merged,
            unmatched = report.unmatched,
            duplicates = report.duplicates,
            cancelled = report.cancelled,
            "Batch reconciled"
        );

        report
    }

    /// Keep detections not yet dispatched and claim their source ids
    ///
    /// Detections without a source id are always kept.
    fn select_new(&self, batch: Vec<Detection>) -> Vec<Detection> {
        let mut state = self.state.write();
        batch
            .into_iter()
            .filter(|detection| match &detection.source_id {
                Some(id) => state.processed.insert(id.clone()),
                None => true,
            })
            .collect()
    }

    /// Add an entry unless the same capture is already collected
    fn merge(&self, entry: CollectionEntry, position: MergePosition) -> bool {
        let mut state = self.state.write();

        if state
            .entries
            .iter()
            .any(|existing| existing.is_same_capture(&entry.detection))
        {
            debug!(
                session = %self.session_id,
                source_id = ?entry.detection.source_id,
                "Dropping duplicate entry"
            );
            return false;
        }

        let entries = Arc::make_mut(&mut state.entries);
        match position {
            MergePosition::Front => entries.insert(0, entry),
            MergePosition::Back => entries.push(entry),
        }
        true
    }
}

impl<L> Reconciler<L> {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Handle that can dispose this session from another task
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            token: self.token.clone(),
        }
    }

    /// Dispose the session; later ingests are ignored
    pub fn dispose(&self) {
        info!(session = %self.session_id, "Reconciler session disposed");
        self.token.cancel();
    }

    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// True while any batch is being resolved
    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::SeqCst) > 0
    }

    /// Current collection, most recent first
    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot::new(self.state.read().entries.clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Number of distinct source ids dispatched so far
    pub fn processed_count(&self) -> usize {
        self.state.read().processed.len()
    }

    pub fn is_processed(&self, source_id: &str) -> bool {
        self.state.read().processed.contains(source_id)
    }

    pub fn display_state(&self) -> DisplayState {
        if !self.is_empty() {
            DisplayState::Populated
        } else if self.is_searching() {
            DisplayState::Searching
        } else {
            DisplayState::Empty
        }
    }
}

impl<L> Drop for Reconciler<L> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
