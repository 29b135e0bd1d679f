use anyhow::Result;
use reqwest::Client;
use serde_json::Value;

use crate::constants::headers;
use crate::search::LookupBackend;
use crate::services::gateway::LookupKind;

/// The orchestrator's view of the gateway over HTTP. A 429 is not an error:
/// its body carries the `rateLimit` marker the orchestrator keys on.
#[derive(Clone)]
pub struct CheckApiClient {
    client: Client,
    base_url: String,
}

impl CheckApiClient {
    pub fn new(base_url: String) -> Self {
        Self::with_shared_client(Client::new(), base_url)
    }

    pub fn with_shared_client(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait::async_trait]
impl LookupBackend for CheckApiClient {
    async fn check(
        &self,
        value: &str,
        kind: LookupKind,
        token: Option<&str>,
    ) -> Result<Value> {
        let url = format!(
            "{}/api/check?{}={}",
            self.base_url,
            kind.as_str(),
            urlencoding::encode(value)
        );

        let mut request = self.client.get(&url).header("Accept", "application/json");

        if let Some(token) = token {
            request = request.header(headers::CAPTCHA_TOKEN, token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            return Ok(response.json().await?);
        }

        if !status.is_success() {
            return Err(anyhow::anyhow!("API error: {}", status));
        }

        Ok(response.json().await?)
    }
}
