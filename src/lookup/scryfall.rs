//! Scryfall API client
//!
//! Fuzzy card-name search via `GET /cards/named?fuzzy=...`, with client-side
//! rate limiting.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CardLookup, EnrichmentResult, LookupError};
use crate::config::LookupConfig;

const NAMED_PATH: &str = "/cards/named";

/// Card object as returned by Scryfall (only the fields we read)
#[derive(Debug, Deserialize)]
struct ScryfallCard {
    name: String,
    #[serde(default)]
    image_uris: Option<ImageUris>,
    /// Double-faced cards keep their artwork per face
    #[serde(default)]
    card_faces: Vec<CardFace>,
}

#[derive(Debug, Deserialize)]
struct ImageUris {
    normal: String,
}

#[derive(Debug, Deserialize)]
struct CardFace {
    #[serde(default)]
    image_uris: Option<ImageUris>,
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Scryfall lookup client
pub struct ScryfallClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl ScryfallClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }
        let http_client = builder
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::new(config.min_interval_ms)),
        })
    }

    /// Full URL of the fuzzy-name endpoint
    pub fn named_url(&self) -> String {
        format!("{}{}", self.base_url, NAMED_PATH)
    }
}

#[async_trait]
impl CardLookup for ScryfallClient {
    async fn lookup(&self, query: &str) -> Result<Option<EnrichmentResult>, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        self.rate_limiter.wait().await;

        let url = self.named_url();
        debug!(query = %query, url = %url, "Querying Scryfall");

        let response = self
            .http_client
            .get(&url)
            .query(&[("fuzzy", query)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        let result = interpret_response(status, &body)?;

        match &result {
            Some(card) => info!(
                query = %query,
                name = %card.canonical_name,
                "Matched card on Scryfall"
            ),
            None => debug!(query = %query, "No Scryfall card for query"),
        }

        Ok(result)
    }
}

fn map_transport_error(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Network(e.to_string())
    }
}

/// Map a status/body pair to a lookup outcome; 404 means "no such card"
fn interpret_response(
    status: StatusCode,
    body: &str,
) -> Result<Option<EnrichmentResult>, LookupError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !status.is_success() {
        return Err(LookupError::Status(status.as_u16(), body.to_string()));
    }

    parse_card(body).map(Some)
}

fn parse_card(body: &str) -> Result<EnrichmentResult, LookupError> {
    let card: ScryfallCard =
        serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;

    let image_url = card
        .image_uris
        .map(|uris| uris.normal)
        .or_else(|| {
            card.card_faces
                .into_iter()
                .find_map(|face| face.image_uris.map(|uris| uris.normal))
        })
        .ok_or_else(|| LookupError::Parse(format!("card '{}' has no image", card.name)))?;

    Ok(EnrichmentResult {
        canonical_name: card.name,
        image_url,
    })
}
