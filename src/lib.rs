//! Heatmap - event and lead data prepared for map rendering
//!
//! This library provides the ingestion pipeline (payload parsing, geofilter,
//! marker flattening), rendering dispatch, and the shared types used by the
//! render, serve, and convert binaries.

pub mod collect;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod models;
pub mod sentinel;

pub use collect::{collect_geocoded_markers, collect_markers, collect_markers_from_str};
pub use error::{FetchError, GeocodeError, IngestError};
pub use models::{Event, EventId, EventsPayload, GeoPoint, IngestContract, Marker};
pub use sentinel::is_within_bounds;
