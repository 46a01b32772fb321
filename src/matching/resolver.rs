//! Two-stage card resolution: original text first, translation as fallback

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::normalize::normalize;
use crate::lookup::{CardLookup, EnrichmentResult};
use crate::ocr::Detection;

/// How a detection's lookup ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// A card was found
    Matched,
    /// Every attempted query came back empty
    NoMatch,
    /// Nothing matched and at least one query failed in transport
    LookupFailed,
}

/// Enrichment together with the outcome that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub enrichment: Option<EnrichmentResult>,
    pub status: MatchStatus,
}

/// Resolves detections to cards through a [`CardLookup`]
pub struct MatchResolver<L> {
    lookup: L,
}

impl<L: CardLookup> MatchResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Resolve a detection to a card, or `None`
    pub async fn resolve(&self, detection: &Detection) -> Option<EnrichmentResult> {
        self.resolve_detailed(detection).await.enrichment
    }

    /// Resolve a detection, also reporting whether a lookup failed along the way
    pub async fn resolve_detailed(&self, detection: &Detection) -> Resolution {
        let mut failed = false;
        let mut result = None;

        let clean_original = normalize(&detection.original_text);
        if !clean_original.is_empty() {
            result = self.attempt(&clean_original, &mut failed).await;
            if result.is_some() {
                return Resolution {
                    enrichment: result,
                    status: MatchStatus::Matched,
                };
            }
        }

        let clean_translated = normalize(&detection.translated_text);
        if result.is_none() && !clean_translated.is_empty() && clean_translated != clean_original {
            debug!(
                original = %clean_original,
                translated = %clean_translated,
                "Falling back to translated text"
            );
            result = self.attempt(&clean_translated, &mut failed).await;
        }

        let status = match (&result, failed) {
            (Some(_), _) => MatchStatus::Matched,
            (None, true) => MatchStatus::LookupFailed,
            (None, false) => MatchStatus::NoMatch,
        };

        Resolution {
            enrichment: result,
            status,
        }
    }

    async fn attempt(&self, query: &str, failed: &mut bool) -> Option<EnrichmentResult> {
        match self.lookup.lookup(query).await {
            Ok(result) => result,
            Err(e) => {
                warn!(query = %query, error = %e, "Card lookup failed");
                *failed = true;
                None
            }
        }
    }
}
