//! Map document renderer.
//!
//! Fetches an events payload, runs the ingestion pipeline, and writes the
//! resulting map document (markers, heatmap, event pins) as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use heatmap::config::MapConfig;
use heatmap::dispatch::{MapSession, MapStyle, RenderKind};
use heatmap::document::MapDocument;
use heatmap::fetch::ApiClient;
use heatmap::geocode::{Geocoder, GoogleGeocoder};
use heatmap::models::{GeoPoint, IngestContract};

#[derive(Parser, Debug)]
#[command(name = "render")]
#[command(about = "Render event data into a map document")]
struct Args {
    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Events API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Events API path
    #[arg(long)]
    api_path: Option<String>,

    /// Read the payload from a file instead of the API
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Initial map center as "lat,lng"
    #[arg(long, value_parser = parse_center)]
    center: Option<GeoPoint>,

    #[arg(long, value_enum)]
    style: Option<MapStyle>,

    /// Render selector; overrides the --show-* flags
    #[arg(long, value_enum)]
    kind: Option<RenderKind>,

    #[arg(long, value_enum)]
    contract: Option<IngestContract>,

    #[arg(long)]
    show_markers: Option<bool>,

    #[arg(long)]
    show_heatmap: Option<bool>,

    #[arg(long)]
    show_events: Option<bool>,

    /// Google Geocoding API key (needed for events and zips)
    #[arg(long)]
    geocoder_key: Option<String>,
}

fn parse_center(s: &str) -> Result<GeoPoint, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid coordinate: {}", e))?;

    match parts.as_slice() {
        [lat, lng] => Ok(GeoPoint::new(*lat, *lng)),
        _ => Err("expected \"lat,lng\"".to_string()),
    }
}

impl Args {
    fn apply(&self, mut config: MapConfig) -> MapConfig {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(path) = &self.api_path {
            config.api_path = path.clone();
        }
        if let Some(center) = self.center {
            config.center = center;
        }
        if let Some(style) = self.style {
            config.style = style;
        }
        if let Some(contract) = self.contract {
            config.contract = contract;
        }
        if self.kind.is_some() {
            config.kind = self.kind;
        }
        if let Some(v) = self.show_markers {
            config.show_markers = v;
        }
        if let Some(v) = self.show_heatmap {
            config.show_heatmap = v;
        }
        if let Some(v) = self.show_events {
            config.show_events = v;
        }
        if let Some(key) = &self.geocoder_key {
            config.geocoder_key = Some(key.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout carries the document
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => MapConfig::load_from_file(path)?,
        None => MapConfig::default(),
    };
    let config = args.apply(config);
    let options = config.render_options();

    let mut document = MapDocument::new(config.view());

    if options.should_fetch() {
        let geocoder = config
            .geocoder_key
            .as_ref()
            .map(GoogleGeocoder::new)
            .transpose()
            .context("Failed to create geocoder")?;
        let geocoder: Option<&dyn Geocoder> = geocoder.as_ref().map(|g| g as &dyn Geocoder);

        let raw = match &args.input {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            None => {
                let client = ApiClient::new(&config.api_url)?;
                client.fetch_payload(&config.api_path).await?
            }
        };

        let mut session = MapSession::new(config.contract);
        match (config.contract, geocoder) {
            (IngestContract::Zips, Some(geocoder)) => {
                session.refresh_geocoded(&raw, geocoder).await?;
            }
            (IngestContract::Zips, None) => {
                anyhow::bail!("The zips contract needs --geocoder-key")
            }
            (IngestContract::Coordinates, _) => {
                session.refresh(&raw)?;
            }
        }
        info!(
            "Loaded {} events, {} markers in bounds",
            session.payload().events.len(),
            session.markers().len()
        );

        session.render(options, &mut document, geocoder).await;
    } else {
        info!("Nothing to render; skipping fetch");
    }

    let json = document.to_json_pretty()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote map document to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
