use anyhow::Result;
use reqwest::Client;

use crate::services::gateway::{LookupKind, LookupProvider, ProviderResponse};

/// Proxied third-party lookup provider. The gateway interprets the result; the
/// client only moves the request across the wire.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl UpstreamClient {
    pub fn new(base_url: String, user_agent: String) -> Self {
        Self::with_shared_client(Client::new(), base_url, user_agent)
    }

    pub fn with_shared_client(client: Client, base_url: String, user_agent: String) -> Self {
        Self {
            client,
            base_url,
            user_agent,
        }
    }
}

#[async_trait::async_trait]
impl LookupProvider for UpstreamClient {
    async fn lookup(&self, kind: LookupKind, value: &str) -> Result<ProviderResponse> {
        let url = format!(
            "{}?{}={}",
            self.base_url,
            kind.as_str(),
            urlencoding::encode(value)
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status().as_u16();

        if !(200..300).contains(&status) {
            return Ok(ProviderResponse {
                status,
                payload: serde_json::Value::Null,
            });
        }

        let payload = response.json().await?;

        Ok(ProviderResponse { status, payload })
    }
}
