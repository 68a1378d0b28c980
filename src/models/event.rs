//! Event payload structure as served by the events API.

use serde::{Deserialize, Serialize};

/// Geographic point (lat/lng, decimal degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.lng, point.lat)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// Event identifier. The API sends either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(i64),
    /// Integers past `i64::MAX`
    Unsigned(u64),
    Text(String),
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventId::Number(n) => write!(f, "{}", n),
            EventId::Unsigned(n) => write!(f, "{}", n),
            EventId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Which location field a deployment reads from each event
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IngestContract {
    /// `locations: [{lat, lng}, ...]`, already resolved
    #[default]
    Coordinates,
    /// `zips: ["94103", ...]`, resolved through a geocoder
    Zips,
}

impl IngestContract {
    /// Name of the payload field holding the event's sites
    pub fn field(&self) -> &'static str {
        match self {
            IngestContract::Coordinates => "locations",
            IngestContract::Zips => "zips",
        }
    }
}

/// Sites attached to a single event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sites {
    Locations(Vec<GeoPoint>),
    Zips(Vec<String>),
}

impl Sites {
    /// Resolved coordinates, empty for zip-based events
    pub fn locations(&self) -> &[GeoPoint] {
        match self {
            Sites::Locations(points) => points,
            Sites::Zips(_) => &[],
        }
    }

    /// Free-text zips, empty for coordinate-based events
    pub fn zips(&self) -> &[String] {
        match self {
            Sites::Locations(_) => &[],
            Sites::Zips(zips) => zips,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Sites::Locations(points) => points.len(),
            Sites::Zips(zips) => zips.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single event (or lead) with its sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub address: String,
    pub title: String,
    pub id: EventId,
    #[serde(flatten)]
    pub sites: Sites,
}

/// Top-level API payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsPayload {
    pub events: Vec<Event>,
}

impl EventsPayload {
    /// Total number of sites across all events
    pub fn site_count(&self) -> usize {
        self.events.iter().map(|e| e.sites.len()).sum()
    }
}
