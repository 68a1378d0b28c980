//! Marker ingestion: nested event payload to flat, geofiltered markers.
//!
//! Parsing is strict about the payload's structure (every event needs an
//! address, title, id and a site list) and lenient about individual
//! coordinates: a location without finite numeric `lat`/`lng` is treated as
//! out of bounds and dropped rather than failing the whole payload.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::IngestError;
use crate::geocode::{geocode_batch, Geocoder};
use crate::models::{Event, EventId, EventsPayload, GeoPoint, IngestContract, Marker, Sites};
use crate::sentinel::{filter_locations, is_within_bounds};

/// Parse a coordinates-contract payload
pub fn parse_payload(raw: &str) -> Result<EventsPayload, IngestError> {
    parse_payload_with(raw, IngestContract::Coordinates)
}

/// Parse a payload, reading each event's sites from the contract's field
pub fn parse_payload_with(
    raw: &str,
    contract: IngestContract,
) -> Result<EventsPayload, IngestError> {
    let value: Value = serde_json::from_str(raw)?;
    payload_from_value(&value, contract)
}

/// Validate an already-parsed JSON document
pub fn payload_from_value(
    value: &Value,
    contract: IngestContract,
) -> Result<EventsPayload, IngestError> {
    let root = value
        .as_object()
        .ok_or_else(|| IngestError::invalid("$", "an object"))?;

    let events = match root.get("events") {
        None => return Err(IngestError::missing("events")),
        Some(Value::Array(events)) => events,
        Some(_) => return Err(IngestError::invalid("events", "an array")),
    };

    let events = events
        .iter()
        .enumerate()
        .map(|(i, event)| parse_event(event, &format!("events[{}]", i), contract))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EventsPayload { events })
}

fn parse_event(value: &Value, path: &str, contract: IngestContract) -> Result<Event, IngestError> {
    let obj = value
        .as_object()
        .ok_or_else(|| IngestError::invalid(path, "an object"))?;

    let address = string_field(obj, path, "address")?;
    let title = string_field(obj, path, "title")?;

    let id = match obj.get("id") {
        None => return Err(IngestError::missing(format!("{}.id", path))),
        Some(Value::String(s)) => EventId::Text(s.clone()),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_u64()) {
            (Some(n), _) => EventId::Number(n),
            (None, Some(n)) => EventId::Unsigned(n),
            (None, None) => {
                return Err(IngestError::invalid(
                    format!("{}.id", path),
                    "an integer or a string",
                ))
            }
        },
        Some(_) => {
            return Err(IngestError::invalid(
                format!("{}.id", path),
                "an integer or a string",
            ))
        }
    };

    let field = contract.field();
    let sites_path = format!("{}.{}", path, field);
    let entries = match obj.get(field) {
        None => return Err(IngestError::missing(sites_path)),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(IngestError::invalid(sites_path, "an array")),
    };

    let sites = match contract {
        IngestContract::Coordinates => Sites::Locations(
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    // NaN never passes the geofilter
                    parse_point(entry).unwrap_or_else(|| {
                        debug!("{}[{}] has no usable coordinates, dropping", sites_path, i);
                        GeoPoint::new(f64::NAN, f64::NAN)
                    })
                })
                .collect(),
        ),
        IngestContract::Zips => Sites::Zips(
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| match entry {
                    Value::String(zip) => Ok(zip.clone()),
                    _ => Err(IngestError::invalid(
                        format!("{}[{}]", sites_path, i),
                        "a string",
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    Ok(Event {
        address,
        title,
        id,
        sites,
    })
}

fn string_field(obj: &Map<String, Value>, path: &str, name: &str) -> Result<String, IngestError> {
    match obj.get(name) {
        None => Err(IngestError::missing(format!("{}.{}", path, name))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(IngestError::invalid(format!("{}.{}", path, name), "a string")),
    }
}

/// `{lat, lng}` with finite numbers, or nothing
fn parse_point(value: &Value) -> Option<GeoPoint> {
    let obj = value.as_object()?;
    let lat = obj.get("lat")?.as_f64()?;
    let lng = obj.get("lng")?.as_f64()?;
    if lat.is_finite() && lng.is_finite() {
        Some(GeoPoint::new(lat, lng))
    } else {
        None
    }
}

/// Flatten events into markers, one per in-bounds location.
///
/// Output order is event order, then location order within the event.
/// Zip-based events carry no coordinates and produce nothing here; use
/// [`collect_geocoded_markers`] for those.
pub fn collect_markers(payload: &EventsPayload) -> Vec<Marker> {
    let mut markers = Vec::new();

    for event in &payload.events {
        for location in filter_locations(event.sites.locations()) {
            markers.push(Marker::new(event, location));
        }
    }

    debug!(
        "Collected {} markers from {} sites",
        markers.len(),
        payload.site_count()
    );
    markers
}

/// Parse a coordinates-contract payload and flatten it
pub fn collect_markers_from_str(raw: &str) -> Result<Vec<Marker>, IngestError> {
    let payload = parse_payload(raw)?;
    Ok(collect_markers(&payload))
}

/// Geocode every zip of every event, then flatten the in-bounds results.
///
/// All lookups run as independent futures and are joined before any marker
/// is built, so output order matches event/zip order regardless of which
/// lookup finishes first. Failed lookups are logged and omitted.
pub async fn collect_geocoded_markers<G>(payload: &EventsPayload, geocoder: &G) -> Vec<Marker>
where
    G: Geocoder + ?Sized,
{
    let pairs: Vec<(&Event, &str)> = payload
        .events
        .iter()
        .flat_map(|event| event.sites.zips().iter().map(move |zip| (event, zip.as_str())))
        .collect();

    let points = geocode_batch(geocoder, pairs.iter().map(|(_, zip)| *zip)).await;

    let markers: Vec<Marker> = pairs
        .into_iter()
        .zip(points)
        .filter_map(|((event, _), point)| {
            point
                .filter(is_within_bounds)
                .map(|location| Marker::new(event, location))
        })
        .collect();

    info!(
        "Geocoded {} markers from {} zips",
        markers.len(),
        payload.site_count()
    );
    markers
}

/// Resolve an event's zips into coordinates, converting it to the
/// coordinates contract. Failed lookups are skipped.
pub async fn resolve_zips<G>(event: &Event, geocoder: &G) -> Event
where
    G: Geocoder + ?Sized,
{
    let zips = event.sites.zips();
    let points = geocode_batch(geocoder, zips.iter().map(String::as_str)).await;

    Event {
        address: event.address.clone(),
        title: event.title.clone(),
        id: event.id.clone(),
        sites: Sites::Locations(points.into_iter().flatten().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::StaticGeocoder;

    const RALLY: &str = r#"{"events":[{"address":"1 Main St","title":"Rally","id":7,
        "locations":[{"lat":40,"lng":-75},{"lat":65,"lng":-150}]}]}"#;

    fn event(id: i64, locations: Vec<GeoPoint>) -> Event {
        Event {
            address: format!("{} Oak Ave", id),
            title: format!("Event {}", id),
            id: EventId::Number(id),
            sites: Sites::Locations(locations),
        }
    }

    #[test]
    fn test_end_to_end_drops_out_of_bounds() {
        let markers = collect_markers_from_str(RALLY).unwrap();
        assert_eq!(
            markers,
            vec![Marker {
                address: "1 Main St".to_string(),
                title: "Rally".to_string(),
                id: EventId::Number(7),
                location: GeoPoint::new(40.0, -75.0),
            }]
        );
    }

    #[test]
    fn test_three_locations_one_outside() {
        let payload = EventsPayload {
            events: vec![event(
                3,
                vec![
                    GeoPoint::new(35.0, -100.0),
                    GeoPoint::new(10.0, -100.0),
                    GeoPoint::new(45.0, -90.0),
                ],
            )],
        };
        let markers = collect_markers(&payload);
        assert_eq!(markers.len(), 2);
        for m in &markers {
            assert_eq!(m.address, "3 Oak Ave");
            assert_eq!(m.title, "Event 3");
            assert_eq!(m.id, EventId::Number(3));
        }
    }

    #[test]
    fn test_empty_events() {
        assert!(collect_markers_from_str(r#"{"events":[]}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_order_preserved_across_events() {
        let a0 = GeoPoint::new(30.0, -90.0);
        let a1 = GeoPoint::new(31.0, -91.0);
        let b0 = GeoPoint::new(32.0, -92.0);
        let payload = EventsPayload {
            events: vec![event(1, vec![a0, a1]), event(2, vec![b0])],
        };
        let got: Vec<(EventId, GeoPoint)> = collect_markers(&payload)
            .into_iter()
            .map(|m| (m.id, m.location))
            .collect();
        assert_eq!(
            got,
            vec![
                (EventId::Number(1), a0),
                (EventId::Number(1), a1),
                (EventId::Number(2), b0),
            ]
        );
    }

    #[test]
    fn test_no_dedup_and_idempotent() {
        let shared = GeoPoint::new(40.0, -100.0);
        let payload = EventsPayload {
            events: vec![event(1, vec![shared]), event(2, vec![shared])],
        };
        let first = collect_markers(&payload);
        let second = collect_markers(&payload);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_events_field() {
        let err = parse_payload(r#"{"items":[]}"#).unwrap_err();
        assert!(matches!(err, IngestError::MissingField { .. }));
        assert_eq!(err.field(), Some("events"));
    }

    #[test]
    fn test_events_not_array() {
        let err = parse_payload(r#"{"events":{}}"#).unwrap_err();
        assert_eq!(err.field(), Some("events"));
    }

    #[test]
    fn test_locations_not_array_names_the_event() {
        let raw = r#"{"events":[
            {"address":"a","title":"t","id":1,"locations":[]},
            {"address":"b","title":"u","id":2,"locations":"40,-75"}]}"#;
        let err = parse_payload(raw).unwrap_err();
        assert!(matches!(err, IngestError::InvalidField { .. }));
        assert_eq!(err.field(), Some("events[1].locations"));
    }

    #[test]
    fn test_missing_title_and_bad_id() {
        let err = parse_payload(r#"{"events":[{"address":"a","id":1,"locations":[]}]}"#)
            .unwrap_err();
        assert_eq!(err.field(), Some("events[0].title"));

        let err = parse_payload(
            r#"{"events":[{"address":"a","title":"t","id":1.5,"locations":[]}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("events[0].id"));
    }

    #[test]
    fn test_string_id_accepted() {
        let markers = collect_markers_from_str(
            r#"{"events":[{"address":"a","title":"t","id":"abc",
                "locations":[{"lat":40,"lng":-75}]}]}"#,
        )
        .unwrap();
        assert_eq!(markers[0].id, EventId::Text("abc".to_string()));
    }

    #[test]
    fn test_id_past_i64_range_accepted() {
        let payload = parse_payload(
            r#"{"events":[{"address":"a","title":"t","id":9223372036854775808,
                "locations":[{"lat":40,"lng":-75}]}]}"#,
        )
        .unwrap();
        let id = &payload.events[0].id;
        assert_eq!(*id, EventId::Unsigned(9_223_372_036_854_775_808));
        assert_eq!(id.to_string(), "9223372036854775808");
        assert_eq!(
            serde_json::to_string(id).unwrap(),
            "9223372036854775808"
        );

        let err = parse_payload(
            r#"{"events":[{"address":"a","title":"t","id":-1e30,"locations":[]}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("events[0].id"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_payload("{events: ").unwrap_err(),
            IngestError::Json(_)
        ));
    }

    #[test]
    fn test_malformed_coordinates_are_dropped() {
        let raw = r#"{"events":[{"address":"a","title":"t","id":1,"locations":[
            {"lat":"40","lng":-75},
            {"lat":40},
            null,
            {"lat":41,"lng":-76}]}]}"#;
        let payload = parse_payload(raw).unwrap();
        assert_eq!(payload.site_count(), 4);
        let markers = collect_markers(&payload);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].location, GeoPoint::new(41.0, -76.0));
    }

    #[test]
    fn test_zips_contract_reads_zips_field() {
        let raw = r#"{"events":[{"address":"a","title":"t","id":1,"zips":["10001","94103"]}]}"#;
        let payload = parse_payload_with(raw, IngestContract::Zips).unwrap();
        assert_eq!(
            payload.events[0].sites.zips(),
            &["10001".to_string(), "94103".to_string()]
        );

        let err = parse_payload(raw).unwrap_err();
        assert_eq!(err.field(), Some("events[0].locations"));

        let bad = r#"{"events":[{"address":"a","title":"t","id":1,"zips":[10001]}]}"#;
        let err = parse_payload_with(bad, IngestContract::Zips).unwrap_err();
        assert_eq!(err.field(), Some("events[0].zips[0]"));
    }

    #[tokio::test]
    async fn test_geocoded_markers_filter_and_skip_failures() {
        let geocoder = StaticGeocoder::from_iter([
            ("10001".to_string(), GeoPoint::new(40.75, -73.99)),
            ("99501".to_string(), GeoPoint::new(61.2, -149.9)),
            ("94103".to_string(), GeoPoint::new(37.77, -122.41)),
        ]);
        let raw = r#"{"events":[
            {"address":"a","title":"t","id":1,"zips":["10001","00000","99501"]},
            {"address":"b","title":"u","id":2,"zips":["94103"]}]}"#;
        let payload = parse_payload_with(raw, IngestContract::Zips).unwrap();

        let markers = collect_geocoded_markers(&payload, &geocoder).await;
        let got: Vec<(EventId, GeoPoint)> =
            markers.into_iter().map(|m| (m.id, m.location)).collect();
        assert_eq!(
            got,
            vec![
                (EventId::Number(1), GeoPoint::new(40.75, -73.99)),
                (EventId::Number(2), GeoPoint::new(37.77, -122.41)),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_zips_converts_contract() {
        let geocoder =
            StaticGeocoder::from_iter([("10001".to_string(), GeoPoint::new(40.75, -73.99))]);
        let event = Event {
            address: "a".to_string(),
            title: "t".to_string(),
            id: EventId::Number(1),
            sites: Sites::Zips(vec!["10001".to_string(), "bogus".to_string()]),
        };
        let resolved = resolve_zips(&event, &geocoder).await;
        assert_eq!(
            resolved.sites,
            Sites::Locations(vec![GeoPoint::new(40.75, -73.99)])
        );
        assert_eq!(resolved.id, event.id);
    }
}
