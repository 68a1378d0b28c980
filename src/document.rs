//! Serializable map document: the crate's concrete rendering collaborator.
//!
//! A front end hands this JSON to whatever map library it uses. Marker and
//! event layers follow a GeoJSON-like `FeatureCollection` layout; the heatmap
//! layer carries weighted points plus the layer parameters.

use chrono::{DateTime, Utc};
use geo::{BoundingRect, MultiPoint, Point, Rect};
use hashbrown::HashMap;
use serde::Serialize;

use crate::dispatch::{MapStyle, Renderer};
use crate::models::{EventId, GeoPoint, Marker};
use crate::sentinel::continental_us;

pub const DEFAULT_ZOOM: u8 = 5;
pub const HEATMAP_RADIUS: u32 = 45;
pub const HEATMAP_MAX_INTENSITY: u32 = 10;

/// Initial view of the map
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    pub style: MapStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    fn new(features: Vec<Feature>) -> Self {
        Self {
            collection_type: "FeatureCollection",
            features,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Clone, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geo_type: &'static str,
    /// `[lng, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct Properties {
    pub address: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    /// Info-window HTML shown when the pin is clicked
    pub info: String,
}

impl Feature {
    fn point(location: GeoPoint, properties: Properties) -> Self {
        Self {
            feature_type: "Feature",
            geometry: Geometry {
                geo_type: "Point",
                coordinates: [location.lng, location.lat],
            },
            properties,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedPoint {
    pub lat: f64,
    pub lng: f64,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapLayer {
    pub radius: u32,
    pub max_intensity: u32,
    pub data: Vec<WeightedPoint>,
}

impl HeatmapLayer {
    /// Collapse identical coordinates into weighted points, keeping
    /// first-occurrence order
    pub fn from_markers(markers: &[Marker]) -> Self {
        let mut slots: HashMap<(u64, u64), usize> = HashMap::new();
        let mut data: Vec<WeightedPoint> = Vec::new();

        for marker in markers {
            let loc = marker.location;
            let key = (loc.lat.to_bits(), loc.lng.to_bits());
            match slots.get(&key) {
                Some(&i) => data[i].weight += 1,
                None => {
                    slots.insert(key, data.len());
                    data.push(WeightedPoint {
                        lat: loc.lat,
                        lng: loc.lng,
                        weight: 1,
                    });
                }
            }
        }

        Self {
            radius: HEATMAP_RADIUS,
            max_intensity: HEATMAP_MAX_INTENSITY,
            data,
        }
    }
}

/// Envelope of everything rendered, for fit-to-bounds.
///
/// Until a point is rendered this is the continental-US box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            north: rect.max().y,
            south: rect.min().y,
            east: rect.max().x,
            west: rect.min().x,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapDocument {
    pub map: MapView,
    pub markers: Option<FeatureCollection>,
    pub heatmap: Option<HeatmapLayer>,
    pub events: Option<FeatureCollection>,
    pub bounds: Bounds,
    pub generated_at: DateTime<Utc>,
    /// Whether `bounds` has been fitted to rendered points yet
    #[serde(skip)]
    fitted: bool,
}

impl MapDocument {
    pub fn new(view: MapView) -> Self {
        Self {
            map: view,
            markers: None,
            heatmap: None,
            events: None,
            bounds: continental_us().into(),
            generated_at: Utc::now(),
            fitted: false,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn extend_bounds<I>(&mut self, locations: I)
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let points: Vec<Point<f64>> = locations.into_iter().map(Point::from).collect();
        let Some(rect) = MultiPoint::new(points).bounding_rect() else {
            return;
        };

        let b = self.bounds;
        self.bounds = if self.fitted {
            Bounds {
                north: b.north.max(rect.max().y),
                south: b.south.min(rect.min().y),
                east: b.east.max(rect.max().x),
                west: b.west.min(rect.min().x),
            }
        } else {
            rect.into()
        };
        self.fitted = true;
    }
}

/// Info-window content for a pin
pub fn info_html(address: &str, title: &str, id: Option<&EventId>) -> String {
    let mut html = format!(
        "<b>Address:</b> {}<br><b>Title:</b> {}<br>",
        escape_html(address),
        escape_html(title)
    );
    if let Some(id) = id {
        html.push_str(&format!("<b>ID:</b> {}<br>", escape_html(&id.to_string())));
    }
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl Renderer for MapDocument {
    fn render_markers(&mut self, markers: &[Marker]) {
        let features = markers
            .iter()
            .map(|m| {
                Feature::point(
                    m.location,
                    Properties {
                        address: m.address.clone(),
                        title: m.title.clone(),
                        id: Some(m.id.clone()),
                        info: info_html(&m.address, &m.title, Some(&m.id)),
                    },
                )
            })
            .collect();

        self.markers = Some(FeatureCollection::new(features));
        self.extend_bounds(markers.iter().map(|m| m.location));
    }

    fn render_heatmap(&mut self, markers: &[Marker]) {
        self.heatmap = Some(HeatmapLayer::from_markers(markers));
        self.extend_bounds(markers.iter().map(|m| m.location));
    }

    fn render_event(&mut self, address: &str, title: &str, location: GeoPoint) {
        let feature = Feature::point(
            location,
            Properties {
                address: address.to_string(),
                title: title.to_string(),
                id: None,
                info: info_html(address, title, None),
            },
        );

        self.events
            .get_or_insert_with(|| FeatureCollection::new(Vec::new()))
            .features
            .push(feature);
        self.extend_bounds([location]);
    }
}
