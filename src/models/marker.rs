use serde::{Deserialize, Serialize};

use super::{Event, EventId, GeoPoint};

/// One (event, location) pair that survived the geofilter.
///
/// Not to be confused with a map library's marker widget; this is only the
/// data handed to rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub address: String,
    pub title: String,
    pub id: EventId,
    pub location: GeoPoint,
}

impl Marker {
    pub fn new(event: &Event, location: GeoPoint) -> Self {
        Self {
            address: event.address.clone(),
            title: event.title.clone(),
            id: event.id.clone(),
            location,
        }
    }
}
