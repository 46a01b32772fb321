//! card-lens - trading card scanner
//!
//! Uploads card photos to an OCR/translation backend, looks the recognized
//! names up in the Scryfall card database, and keeps a deduplicated,
//! most-recent-first collection of the results.

pub mod app;
pub mod collection;
pub mod config;
pub mod lookup;
pub mod matching;
pub mod ocr;
pub mod shared;
pub mod storage;

pub use app::{CaptureOutcome, CardLensApp};
pub use collection::{CollectionEntry, CollectionSnapshot, DisplayState, Reconciler};
pub use config::AppConfig;
pub use lookup::{CardLookup, EnrichmentResult, LookupError, ScryfallClient};
pub use matching::{normalize, MatchResolver, MatchStatus};
pub use ocr::{Detection, OcrClient, OcrError};
