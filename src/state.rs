use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::{TurnstileClient, UpstreamClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::gateway::{CaptchaVerifier, Gateway, LookupProvider};
use crate::services::gateway_impl::ProxyGateway;

/// Build a shared HTTP client with reasonable defaults for API calls.
/// Reused across all HTTP-based collaborators to enable connection pooling
/// and avoid socket exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub gateway: Arc<dyn Gateway>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.upstream.request_timeout_seconds)?;

        let captcha = Arc::new(TurnstileClient::with_shared_client(
            http_client.clone(),
            config.captcha.verify_url.clone(),
            config.captcha.secret_key.clone(),
        )) as Arc<dyn CaptchaVerifier>;

        let provider = Arc::new(UpstreamClient::with_shared_client(
            http_client,
            config.upstream.base_url.clone(),
            config.upstream.user_agent.clone(),
        )) as Arc<dyn LookupProvider>;

        Self::with_collaborators(config, captcha, provider).await
    }

    /// Wires the gateway around externally supplied collaborators. Tests use
    /// this to swap the verifier and provider for mocks.
    pub async fn with_collaborators(
        config: Config,
        captcha: Arc<dyn CaptchaVerifier>,
        provider: Arc<dyn LookupProvider>,
    ) -> anyhow::Result<Self> {
        let store = Store::new(&config.general.database_path).await?;

        let config = Arc::new(RwLock::new(config));

        let gateway =
            Arc::new(ProxyGateway::new(config.clone(), store.clone(), captcha, provider))
                as Arc<dyn Gateway>;

        Ok(Self {
            config,
            store,
            gateway,
        })
    }
}
