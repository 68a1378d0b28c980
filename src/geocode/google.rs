//! Google Geocoding API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{GeocodeError, GeocodeStatus, Geocoder};
use crate::models::GeoPoint;

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Geocoder backed by the Google Geocoding HTTP API
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: ResultGeometry,
}

#[derive(Debug, Deserialize)]
struct ResultGeometry {
    location: GeoPoint,
}

impl GoogleGeocoder {
    pub fn new(key: impl Into<String>) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent("heatmap/0.1 (geocoder)")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: GEOCODE_ENDPOINT.to_string(),
            key: key.into(),
        })
    }

    /// Point at a different endpoint (proxies, local mocks)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_url(&self, address: &str) -> Result<Url, GeocodeError> {
        Url::parse_with_params(
            &self.endpoint,
            &[("address", address), ("key", self.key.as_str())],
        )
        .map_err(|e| GeocodeError::Decode(format!("bad endpoint {}: {}", self.endpoint, e)))
    }
}

/// First result's location, or the error matching the response status
fn interpret(address: &str, response: GeocodeResponse) -> Result<GeoPoint, GeocodeError> {
    let status = GeocodeStatus::from_code(&response.status);
    if status != GeocodeStatus::Ok {
        if let Some(message) = &response.error_message {
            debug!("Geocoder said {} for '{}': {}", status, address, message);
        }
        return Err(GeocodeError::Status {
            address: address.to_string(),
            status,
        });
    }

    response
        .results
        .into_iter()
        .next()
        .map(|r| r.geometry.location)
        .ok_or_else(|| GeocodeError::NoResults(address.to_string()))
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let url = self.request_url(address)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(GeocodeError::HttpStatus {
                address: address.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Decode(e.to_string()))?;

        let point = interpret(address, body)?;
        debug!("Geocoded '{}' to {}", address, point);
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};

    use super::*;

    fn response(json: &str) -> GeocodeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_ok_takes_first_result() {
        let body = response(
            r#"{"status":"OK","results":[
                {"geometry":{"location":{"lat":40.75,"lng":-73.99}}},
                {"geometry":{"location":{"lat":0.0,"lng":0.0}}}]}"#,
        );
        assert_eq!(
            interpret("10001", body).unwrap(),
            GeoPoint::new(40.75, -73.99)
        );
    }

    #[test]
    fn test_over_query_limit() {
        let body = response(
            r#"{"status":"OVER_QUERY_LIMIT","results":[],"error_message":"slow down"}"#,
        );
        let err = interpret("10001", body).unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::Status {
                status: GeocodeStatus::OverQueryLimit,
                ..
            }
        ));
    }

    #[test]
    fn test_ok_without_results() {
        let body = response(r#"{"status":"OK"}"#);
        assert!(matches!(
            interpret("10001", body).unwrap_err(),
            GeocodeError::NoResults(_)
        ));
    }

    #[test]
    fn test_request_url_encodes_address() {
        let geocoder = GoogleGeocoder::new("secret")
            .unwrap()
            .with_endpoint("http://localhost:9000/geocode");
        let url = geocoder.request_url("1 Main St, Springfield").unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("address".to_string(), "1 Main St, Springfield".to_string()),
                ("key".to_string(), "secret".to_string()),
            ]
        );
    }

    async fn lookup(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        match params.get("address").map(String::as_str) {
            Some("10001") => Json(serde_json::json!({
                "status": "OK",
                "results": [{"geometry": {"location": {"lat": 40.75, "lng": -73.99}}}]
            })),
            _ => Json(serde_json::json!({"status": "ZERO_RESULTS", "results": []})),
        }
    }

    /// Local stand-in for the geocoding service; returns its base URL
    async fn spawn_service() -> String {
        let app = Router::new()
            .route("/geocode", get(lookup))
            .route(
                "/unavailable",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "try later") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_geocode_over_http() {
        let base = spawn_service().await;
        let geocoder = GoogleGeocoder::new("k")
            .unwrap()
            .with_endpoint(format!("{}/geocode", base));

        assert_eq!(
            geocoder.geocode("10001").await.unwrap(),
            GeoPoint::new(40.75, -73.99)
        );
        assert!(matches!(
            geocoder.geocode("nowhere").await.unwrap_err(),
            GeocodeError::Status {
                status: GeocodeStatus::ZeroResults,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let base = spawn_service().await;
        let geocoder = GoogleGeocoder::new("k")
            .unwrap()
            .with_endpoint(format!("{}/unavailable", base));

        match geocoder.geocode("10001").await.unwrap_err() {
            GeocodeError::HttpStatus { address, status } => {
                assert_eq!(address, "10001");
                assert_eq!(status, 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
