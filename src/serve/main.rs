//! Events API server.
//!
//! Serves sample event payloads from a directory, plus the markers the
//! ingestion pipeline derives from them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use clap::Parser;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use heatmap::{collect_markers_from_str, Marker};

mod error;
use error::ServeError;

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Serve sample event payloads")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    listen: String,

    /// Directory holding `<name>.json` payloads
    #[arg(long, default_value = "events")]
    events_dir: PathBuf,
}

/// Application state shared across handlers
struct AppState {
    events_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Heatmap events server");
    info!("Serving payloads from {}", args.events_dir.display());

    if !args.events_dir.is_dir() {
        anyhow::bail!("Events directory {} does not exist", args.events_dir.display());
    }

    let state = Arc::new(AppState {
        events_dir: args.events_dir,
    });

    let app = router(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/{event}", get(event_handler))
        .route("/api/v1/{event}/markers", get(markers_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Raw sample payload
async fn event_handler(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
) -> Result<impl IntoResponse, ServeError> {
    let body = read_payload(&state, &event).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// Markers derived from a sample payload
async fn markers_handler(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
) -> Result<Json<Vec<Marker>>, ServeError> {
    let body = read_payload(&state, &event).await?;
    let markers = collect_markers_from_str(&body)?;
    debug!("{}: {} markers", event, markers.len());
    Ok(Json(markers))
}

async fn read_payload(state: &AppState, event: &str) -> Result<String, ServeError> {
    if !is_safe_name(event) {
        return Err(ServeError::InvalidName(event.to_string()));
    }

    let path = state.events_dir.join(format!("{}.json", event));
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Ok(body),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ServeError::NotFound(event.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// File stems only: no separators, no dots
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
