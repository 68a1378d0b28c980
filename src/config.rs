use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::dispatch::{MapStyle, RenderKind, RenderOptions};
use crate::document::{MapView, DEFAULT_ZOOM};
use crate::models::{GeoPoint, IngestContract};

/// Map configuration. Every field has a default, so a TOML file only needs
/// the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Base URL of the events API
    pub api_url: String,
    /// Path of the events endpoint, joined onto `api_url`
    pub api_path: String,
    pub center: GeoPoint,
    pub zoom: u8,
    pub style: MapStyle,
    pub show_markers: bool,
    pub show_heatmap: bool,
    pub show_events: bool,
    pub contract: IngestContract,
    /// When set, overrides the individual `show_*` flags
    pub kind: Option<RenderKind>,
    pub geocoder_key: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            api_path: "/api/v1/small".to_string(),
            center: GeoPoint::new(39.50, -98.35),
            zoom: DEFAULT_ZOOM,
            style: MapStyle::Political,
            show_markers: false,
            show_heatmap: true,
            show_events: true,
            contract: IngestContract::Coordinates,
            kind: None,
            geocoder_key: None,
        }
    }
}

impl MapConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: MapConfig = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn render_options(&self) -> RenderOptions {
        match self.kind {
            Some(kind) => kind.options(),
            None => RenderOptions {
                show_markers: self.show_markers,
                show_heatmap: self.show_heatmap,
                show_events: self.show_events,
            },
        }
    }

    pub fn view(&self) -> MapView {
        MapView {
            center: self.center,
            zoom: self.zoom,
            style: self.style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MapConfig::default();
        assert_eq!(config.center, GeoPoint::new(39.5, -98.35));
        assert_eq!(
            config.render_options(),
            RenderOptions {
                show_markers: false,
                show_heatmap: true,
                show_events: true
            }
        );
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_url = "https://leads.example.org"
style = "plain"
contract = "zips"

[center]
lat = 36.778261
lng = -119.4179324
"#
        )
        .unwrap();

        let config = MapConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.api_url, "https://leads.example.org");
        assert_eq!(config.api_path, "/api/v1/small");
        assert_eq!(config.style, MapStyle::Plain);
        assert_eq!(config.contract, IngestContract::Zips);
        assert_eq!(config.center.lat, 36.778261);
        assert!(config.show_heatmap);
    }

    #[test]
    fn test_kind_overrides_flags() {
        let config = MapConfig {
            show_events: true,
            kind: Some(RenderKind::Leads),
            ..MapConfig::default()
        };
        let options = config.render_options();
        assert!(options.show_markers);
        assert!(options.show_heatmap);
        assert!(!options.show_events);
    }

    #[test]
    fn test_missing_file() {
        assert!(MapConfig::load_from_file("/nonexistent/heatmap.toml").is_err());
    }
}
