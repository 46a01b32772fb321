//! Scripted card lookup for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::lookup::{CardLookup, EnrichmentResult, LookupError};

/// Start/finish markers recorded around every lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    Started(String),
    Finished(String),
}

type LookupHook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Inner {
    cards: Mutex<HashMap<String, EnrichmentResult>>,
    failures: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    hook: Mutex<Option<LookupHook>>,
    events: Mutex<Vec<LookupEvent>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory [`CardLookup`] answering from a fixed table
///
/// Queries not in the table return `Ok(None)`; queries registered with
/// [`ScriptedLookup::with_failure`] return a network error.
#[derive(Clone, Default)]
pub struct ScriptedLookup {
    inner: Arc<Inner>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_card(self, query: &str, card: EnrichmentResult) -> Self {
        self.inner.cards.lock().insert(query.to_string(), card);
        self
    }

    pub fn with_failure(self, query: &str) -> Self {
        self.inner.failures.lock().insert(query.to_string());
        self
    }

    /// Suspend every lookup for `delay` before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock() = delay;
        self
    }

    /// Run `hook` while a lookup is in flight, after the delay
    pub fn with_hook(self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        *self.inner.hook.lock() = Some(Box::new(hook));
        self
    }

    /// Queries in the order they were issued
    pub fn queries(&self) -> Vec<String> {
        self.inner
            .events
            .lock()
            .iter()
            .filter_map(|event| match event {
                LookupEvent::Started(query) => Some(query.clone()),
                LookupEvent::Finished(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<LookupEvent> {
        self.inner.events.lock().clone()
    }

    /// Highest number of lookups observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardLookup for ScriptedLookup {
    async fn lookup(&self, query: &str) -> Result<Option<EnrichmentResult>, LookupError> {
        self.inner
            .events
            .lock()
            .push(LookupEvent::Started(query.to_string()));
        let running = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.inner.delay.lock();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }

        if let Some(hook) = self.inner.hook.lock().as_ref() {
            hook(query);
        }

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner
            .events
            .lock()
            .push(LookupEvent::Finished(query.to_string()));

        if self.inner.failures.lock().contains(query) {
            return Err(LookupError::Network("connection reset".to_string()));
        }

        Ok(self.inner.cards.lock().get(query).cloned())
    }
}
