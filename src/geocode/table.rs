use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use super::{GeocodeError, GeocodeStatus, Geocoder};
use crate::models::GeoPoint;

/// In-memory address table, for offline conversion and tests
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    table: HashMap<String, GeoPoint>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object of `address -> {lat, lng}`
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read lookup table")?;
        let table: HashMap<String, GeoPoint> =
            serde_json::from_str(&content).context("Failed to parse lookup table")?;
        Ok(Self { table })
    }

    pub fn insert(&mut self, address: impl Into<String>, point: GeoPoint) {
        self.table.insert(address.into(), point);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl FromIterator<(String, GeoPoint)> for StaticGeocoder {
    fn from_iter<T: IntoIterator<Item = (String, GeoPoint)>>(iter: T) -> Self {
        Self {
            table: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        self.table
            .get(address.trim())
            .copied()
            .ok_or_else(|| GeocodeError::Status {
                address: address.to_string(),
                status: GeocodeStatus::ZeroResults,
            })
    }
}
