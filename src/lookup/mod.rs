//! Card Database Lookup Layer
//!
//! Resolves a card name against the public card database. "Not found" is an
//! ordinary answer (`Ok(None)`); anything else that goes wrong is a
//! [`LookupError`] the caller is expected to log and move past.

pub mod scryfall;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use scryfall::ScryfallClient;

/// Canonical metadata for a matched card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// Card name as printed in the database
    pub canonical_name: String,
    /// Displayable artwork URL
    pub image_url: String,
}

impl EnrichmentResult {
    pub fn new(canonical_name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            image_url: image_url.into(),
        }
    }
}

/// Lookup failures other than "not found"
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Lookup timed out")]
    Timeout,

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Fuzzy name lookup against a card database
#[async_trait]
pub trait CardLookup: Send + Sync {
    /// Look up a card by approximate name
    ///
    /// An empty query must return `Ok(None)` without touching the network.
    async fn lookup(&self, query: &str) -> Result<Option<EnrichmentResult>, LookupError>;
}

#[async_trait]
impl<T: CardLookup + ?Sized> CardLookup for Arc<T> {
    async fn lookup(&self, query: &str) -> Result<Option<EnrichmentResult>, LookupError> {
        (**self).lookup(query).await
    }
}
