//! card-lens - scan trading card photos into a deduplicated collection
//!
//! Each image is uploaded to the OCR/translation backend, matched against
//! Scryfall, and added to the session's collection.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use card_lens::config::{self, AppConfig};
use card_lens::{
    storage, CaptureOutcome, CardLensApp, CollectionSnapshot, DisplayState, MatchStatus,
    ScryfallClient,
};

/// card-lens - trading card scanner
#[derive(Parser, Debug)]
#[command(name = "card-lens")]
#[command(about = "Scan trading card photos and match them against Scryfall")]
struct Args {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload card photos and print the resulting collection
    Scan {
        /// Image files, processed in order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Seed the collection from the backend history first
        #[arg(long)]
        history: bool,
    },
    /// Load the backend history and print the collection
    History,
    /// Write the default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::InitConfig => init_config(args.config.as_deref())?,
        Command::Scan { images, history } => {
            let app = open_session(args.config.as_deref())?;
            if history {
                load_history(&app).await;
            }
            for path in &images {
                scan_image(&app, path).await;
            }
            print_collection(app.display_state(), &app.snapshot());
        }
        Command::History => {
            let app = open_session(args.config.as_deref())?;
            load_history(&app).await;
            print_collection(app.display_state(), &app.snapshot());
        }
    }

    Ok(())
}

fn open_session(config_path: Option<&Path>) -> Result<CardLensApp<ScryfallClient>> {
    let config = load_or_default_config(config_path);
    CardLensApp::new(&config)
}

/// Load configuration from file or fall back to defaults
fn load_or_default_config(path: Option<&Path>) -> AppConfig {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match storage::default_config_path() {
            Ok(path) => path,
            Err(e) => {
                info!("No config directory ({}), using default configuration", e);
                return AppConfig::default();
            }
        },
    };

    if path.exists() {
        match config::load_config(&path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => error!("Ignoring invalid configuration: {:#}", e),
        }
    }

    info!("Using default configuration");
    AppConfig::default()
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => storage::default_config_path()?,
    };
    config::save_config(&AppConfig::default(), &path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

async fn load_history(app: &CardLensApp<ScryfallClient>) {
    match app.load_history().await {
        Ok(report) => info!(
            "History loaded: {} new, {} merged",
            report.selected, report.merged
        ),
        Err(e) => error!("Failed to load history: {}", e),
    }
}

async fn scan_image(app: &CardLensApp<ScryfallClient>, path: &Path) {
    match app.capture_file(path).await {
        Ok(CaptureOutcome::Detected { detected_texts, report }) => {
            for text in &detected_texts {
                println!("  {} - {:.2}% ({:?})", text.text, text.confidence, text.kind);
            }
            if report.selected == 0 {
                info!("{} was already scanned", path.display());
            }
        }
        Ok(_) => {}
        Err(e) => error!("{:#}", e),
    }

    if let Some(status) = app.status() {
        if status.kind.is_error() {
            warn!("{}: {}", path.display(), status.text);
        } else {
            println!("{}: {}", path.display(), status.text);
        }
    }
}

fn print_collection(state: DisplayState, snapshot: &CollectionSnapshot) {
    if let Some(placeholder) = state.placeholder() {
        println!("{}", placeholder);
        return;
    }

    println!("Collection ({} cards, {} matched):", snapshot.len(), snapshot.matched_count());
    for entry in snapshot {
        let source = entry.detection.source_id.as_deref().unwrap_or("-");
        match (&entry.enrichment, entry.status) {
            (Some(card), _) => println!("  {} [{}] {}", card.canonical_name, source, card.image_url),
            (None, MatchStatus::LookupFailed) => {
                println!("  {} [{}] lookup failed", entry.detection.original_text, source)
            }
            (None, _) => println!("  {} [{}] no match", entry.detection.original_text, source),
        }
    }
}
