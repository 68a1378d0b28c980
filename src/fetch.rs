//! Events API client.

use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::collect::{collect_markers, parse_payload_with};
use crate::error::FetchError;
use crate::models::{EventsPayload, IngestContract, Marker};

/// Fetches event payloads from the backend API
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base_url)?;
        let client = Client::builder()
            .user_agent("heatmap/0.1")
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self { client, base })
    }

    /// Resolve an API path (e.g. `/api/v1/small`) against the base URL
    pub fn endpoint(&self, api_path: &str) -> Result<Url, FetchError> {
        Ok(self.base.join(api_path)?)
    }

    /// Single GET; returns the raw body text
    pub async fn fetch_payload(&self, api_path: &str) -> Result<String, FetchError> {
        let url = self.endpoint(api_path)?;
        info!("Fetching events from {}", url);

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Fetched {} bytes", body.len());
        Ok(body)
    }

    /// Fetch and parse under the given contract
    pub async fn fetch_events(
        &self,
        api_path: &str,
        contract: IngestContract,
    ) -> Result<EventsPayload, FetchError> {
        let body = self.fetch_payload(api_path).await?;
        Ok(parse_payload_with(&body, contract)?)
    }

    /// Fetch a coordinates payload and flatten it into markers
    pub async fn fetch_markers(&self, api_path: &str) -> Result<Vec<Marker>, FetchError> {
        let payload = self
            .fetch_events(api_path, IngestContract::Coordinates)
            .await?;
        Ok(collect_markers(&payload))
    }
}
