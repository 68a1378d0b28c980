//! Zip-to-coordinate converter.
//!
//! Reads an events file that lists `zips` per event, geocodes every entry,
//! and writes the same events with resolved `locations`, ready for the
//! coordinates ingestion contract.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use heatmap::collect::{parse_payload_with, resolve_zips};
use heatmap::geocode::{Geocoder, GoogleGeocoder, StaticGeocoder};
use heatmap::models::{EventsPayload, IngestContract};

#[derive(Parser, Debug)]
#[command(name = "convert")]
#[command(about = "Geocode event zips into coordinates")]
struct Args {
    /// Events file using `zips`
    #[arg(short, long)]
    input: PathBuf,

    /// Output events file using `locations`
    #[arg(short, long)]
    output: PathBuf,

    /// Google Geocoding API key
    #[arg(long, conflicts_with = "lookup")]
    geocoder_key: Option<String>,

    /// Offline JSON table of `zip -> {lat, lng}` instead of the API
    #[arg(long)]
    lookup: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let geocoder: Box<dyn Geocoder> = match (&args.geocoder_key, &args.lookup) {
        (Some(key), _) => Box::new(GoogleGeocoder::new(key.as_str())?),
        (None, Some(path)) => Box::new(StaticGeocoder::load_from_file(path)?),
        (None, None) => anyhow::bail!("Either --geocoder-key or --lookup is required"),
    };

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let payload = parse_payload_with(&raw, IngestContract::Zips)
        .with_context(|| format!("Failed to parse {}", args.input.display()))?;

    let total = payload.site_count();
    info!(
        "Converting {} events with {} zips",
        payload.events.len(),
        total
    );

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} zips")?
            .progress_chars("#>-"),
    );

    let mut converted = EventsPayload::default();
    let mut resolved = 0;

    for event in &payload.events {
        let located = resolve_zips(event, geocoder.as_ref()).await;
        resolved += located.sites.len();
        pb.inc(event.sites.len() as u64);
        converted.events.push(located);
    }
    pb.finish_and_clear();

    if resolved < total {
        warn!("{} of {} zips could not be geocoded", total - resolved, total);
    }

    let json = serde_json::to_string_pretty(&converted)?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "Wrote {} locations to {}",
        resolved,
        args.output.display()
    );

    Ok(())
}
