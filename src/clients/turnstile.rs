use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::services::gateway::CaptchaVerifier;

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
}

/// Cloudflare Turnstile verifier. Any transport or decode failure reads as
/// "not verified" so a flaky verifier can never open the gate.
#[derive(Clone)]
pub struct TurnstileClient {
    client: Client,
    verify_url: String,
    secret_key: String,
}

impl TurnstileClient {
    pub fn new(verify_url: String, secret_key: String) -> Self {
        Self::with_shared_client(Client::new(), verify_url, secret_key)
    }

    pub fn with_shared_client(client: Client, verify_url: String, secret_key: String) -> Self {
        Self {
            client,
            verify_url,
            secret_key,
        }
    }
}

#[async_trait::async_trait]
impl CaptchaVerifier for TurnstileClient {
    async fn verify(&self, token: &str, client_ip: Option<&str>) -> bool {
        if token.is_empty() {
            return false;
        }

        let mut form = vec![
            ("secret", self.secret_key.clone()),
            ("response", token.to_string()),
        ];
        if let Some(ip) = client_ip {
            form.push(("remoteip", ip.to_string()));
        }

        let response = match self.client.post(&self.verify_url).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Turnstile verification error: {}", e);
                return false;
            }
        };

        match response.json::<SiteVerifyResponse>().await {
            Ok(outcome) => outcome.success,
            Err(e) => {
                warn!("Turnstile response decode error: {}", e);
                false
            }
        }
    }
}
