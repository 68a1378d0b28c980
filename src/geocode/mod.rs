//! Geocoding collaborators: free-text address to coordinates.

mod google;
mod table;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::models::GeoPoint;

pub use crate::error::GeocodeError;
pub use google::GoogleGeocoder;
pub use table::StaticGeocoder;

/// Status codes reported by the geocoding service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
}

impl GeocodeStatus {
    /// Map a wire status code; anything unrecognized is `UnknownError`
    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => GeocodeStatus::Ok,
            "ZERO_RESULTS" => GeocodeStatus::ZeroResults,
            "OVER_QUERY_LIMIT" => GeocodeStatus::OverQueryLimit,
            "REQUEST_DENIED" => GeocodeStatus::RequestDenied,
            "INVALID_REQUEST" => GeocodeStatus::InvalidRequest,
            _ => GeocodeStatus::UnknownError,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GeocodeStatus::Ok => "OK",
            GeocodeStatus::ZeroResults => "ZERO_RESULTS",
            GeocodeStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            GeocodeStatus::RequestDenied => "REQUEST_DENIED",
            GeocodeStatus::InvalidRequest => "INVALID_REQUEST",
            GeocodeStatus::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for GeocodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Resolves a free-text address (street address, zip code) to a point
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}

/// Look up many addresses at once.
///
/// Every lookup is an independent future; all are awaited before returning.
/// The result has one slot per input address, in input order. Failures are
/// logged and leave `None`; nothing is retried.
pub async fn geocode_batch<'a, G, I>(geocoder: &G, addresses: I) -> Vec<Option<GeoPoint>>
where
    G: Geocoder + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let lookups = addresses.into_iter().map(move |address| async move {
        match geocoder.geocode(address).await {
            Ok(point) => Some(point),
            Err(e) => {
                warn!("Geocode failure: {}", e);
                None
            }
        }
    });

    join_all(lookups).await
}
