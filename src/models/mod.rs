//! Core data models for event ingestion and map output.

pub mod event;
pub mod marker;

pub use event::{Event, EventId, EventsPayload, GeoPoint, IngestContract, Sites};
pub use marker::Marker;
