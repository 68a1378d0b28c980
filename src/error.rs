//! Error types for ingestion, geocoding, and API transport.

use crate::geocode::GeocodeStatus;

/// A payload that could not be turned into events.
///
/// Field-bearing variants carry the JSON path of the offending value, e.g.
/// `events[2].locations`.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The payload is not valid JSON at all.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is absent.
    #[error("missing field `{field}`")]
    MissingField { field: String },

    /// A field is present but has the wrong shape.
    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

impl IngestError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected,
        }
    }

    /// Path of the offending field, if the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::MissingField { field } | Self::InvalidField { field, .. } => Some(field),
        }
    }
}

/// A failed address lookup.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// The service answered with a non-OK status.
    #[error("geocode failure for `{address}`: {status}")]
    Status {
        address: String,
        status: GeocodeStatus,
    },

    /// The service answered OK but without any result.
    #[error("no geocoding results for `{0}`")]
    NoResults(String),

    /// The service answered with a non-2xx HTTP status.
    #[error("geocoding service returned HTTP {status} for `{address}`")]
    HttpStatus { address: String, status: u16 },

    #[error("geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected geocoding response: {0}")]
    Decode(String),
}

/// A failed fetch from the events API.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Ingest(#[from] IngestError),
}
