//! Rendering dispatch.
//!
//! Decides, from configuration, which rendering collaborators receive the
//! marker sequence. Rendering itself lives behind [`Renderer`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collect::{collect_geocoded_markers, collect_markers, parse_payload_with};
use crate::error::IngestError;
use crate::geocode::{geocode_batch, Geocoder};
use crate::models::{EventsPayload, GeoPoint, IngestContract, Marker};

/// Base map style
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    /// Muted base map with administrative borders emphasized
    #[default]
    Political,
    /// The map library's default look
    Plain,
}

/// Which layers to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub show_markers: bool,
    pub show_heatmap: bool,
    pub show_events: bool,
}

impl RenderOptions {
    /// Whether any layer needs data at all
    pub fn should_fetch(&self) -> bool {
        self.show_markers || self.show_heatmap || self.show_events
    }
}

/// Three-way render selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    /// Lead markers plus their heatmap
    Leads,
    /// Geocoded event pins
    Events,
    /// Render nothing, fetch nothing
    Nothing,
}

impl RenderKind {
    pub fn options(&self) -> RenderOptions {
        match self {
            RenderKind::Leads => RenderOptions {
                show_markers: true,
                show_heatmap: true,
                show_events: false,
            },
            RenderKind::Events => RenderOptions {
                show_markers: false,
                show_heatmap: false,
                show_events: true,
            },
            RenderKind::Nothing => RenderOptions::default(),
        }
    }
}

/// Rendering collaborator
pub trait Renderer {
    /// Place one pin per marker
    fn render_markers(&mut self, markers: &[Marker]);

    /// Build a density layer from the markers' locations
    fn render_heatmap(&mut self, markers: &[Marker]);

    /// Place a pin for a single geocoded event address
    fn render_event(&mut self, address: &str, title: &str, location: GeoPoint);
}

/// Fan the same marker sequence out to the enabled collaborators.
///
/// Event pins need a geocoder; without one they are skipped with a warning.
/// Event addresses are looked up together and rendered in event order; a
/// failed lookup leaves that event off the map.
pub async fn dispatch<R>(
    payload: &EventsPayload,
    markers: &[Marker],
    options: RenderOptions,
    renderer: &mut R,
    geocoder: Option<&dyn Geocoder>,
) where
    R: Renderer + ?Sized,
{
    if options.show_markers {
        debug!("Rendering {} markers", markers.len());
        renderer.render_markers(markers);
    }

    if options.show_events {
        match geocoder {
            Some(geocoder) => {
                let points = geocode_batch(
                    geocoder,
                    payload.events.iter().map(|e| e.address.as_str()),
                )
                .await;

                let mut rendered = 0;
                for (event, point) in payload.events.iter().zip(points) {
                    if let Some(point) = point {
                        renderer.render_event(&event.address, &event.title, point);
                        rendered += 1;
                    }
                }
                info!(
                    "Rendered {}/{} events",
                    rendered,
                    payload.events.len()
                );
            }
            None => warn!("Event rendering requested but no geocoder is configured"),
        }
    }

    if options.show_heatmap {
        debug!("Rendering heatmap from {} markers", markers.len());
        renderer.render_heatmap(markers);
    }
}

/// Owns the most recently loaded payload and its markers.
///
/// Each refresh replaces both wholesale; a payload that fails to parse
/// leaves the previous state in place.
#[derive(Debug, Default)]
pub struct MapSession {
    contract: IngestContract,
    payload: EventsPayload,
    markers: Vec<Marker>,
}

impl MapSession {
    pub fn new(contract: IngestContract) -> Self {
        Self {
            contract,
            ..Self::default()
        }
    }

    pub fn contract(&self) -> IngestContract {
        self.contract
    }

    /// Load a payload. Zip-based events stay unresolved until
    /// [`refresh_geocoded`](Self::refresh_geocoded) is used instead.
    pub fn refresh(&mut self, raw: &str) -> Result<&[Marker], IngestError> {
        let payload = parse_payload_with(raw, self.contract)?;
        self.markers = collect_markers(&payload);
        self.payload = payload;
        Ok(&self.markers)
    }

    /// Load a payload, geocoding zips when the contract calls for it
    pub async fn refresh_geocoded(
        &mut self,
        raw: &str,
        geocoder: &dyn Geocoder,
    ) -> Result<&[Marker], IngestError> {
        let payload = parse_payload_with(raw, self.contract)?;
        self.markers = match self.contract {
            IngestContract::Coordinates => collect_markers(&payload),
            IngestContract::Zips => collect_geocoded_markers(&payload, geocoder).await,
        };
        self.payload = payload;
        Ok(&self.markers)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn payload(&self) -> &EventsPayload {
        &self.payload
    }

    /// Dispatch the current markers to a renderer
    pub async fn render<R>(
        &self,
        options: RenderOptions,
        renderer: &mut R,
        geocoder: Option<&dyn Geocoder>,
    ) where
        R: Renderer + ?Sized,
    {
        dispatch(&self.payload, &self.markers, options, renderer, geocoder).await;
    }
}
