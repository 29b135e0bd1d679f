use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use crate::services::gateway::Geocoder;

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// OpenStreetMap Nominatim client. Coordinates come back as strings and are
/// parsed; a place that fails to parse is treated as no match.
#[derive(Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: String) -> Self {
        Self::with_shared_client(Client::new(), base_url)
    }

    pub fn with_shared_client(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait::async_trait]
impl Geocoder for NominatimClient {
    async fn search(&self, query: &str) -> Result<Option<(f64, f64)>> {
        let url = format!(
            "{}/search?format=json&q={}&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow::anyhow!("Nominatim error: {}", status));
        }

        let places: Vec<NominatimPlace> = response.json().await?;

        Ok(places.first().and_then(|place| {
            let lat = place.lat.parse().ok()?;
            let lon = place.lon.parse().ok()?;
            Some((lat, lon))
        }))
    }
}
