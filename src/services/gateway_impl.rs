use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::services::gateway::{
    CaptchaVerifier, DenyReason, Gateway, GatewayError, LookupOutcome, LookupProvider,
    LookupRequest, OptOutRequest, payload_indicates_empty,
};

/// Production gateway: origin gate, CAPTCHA gate, quota read, suppression
/// read, provider delegation, then a single quota increment on success.
pub struct ProxyGateway {
    config: Arc<RwLock<Config>>,
    store: Store,
    captcha: Arc<dyn CaptchaVerifier>,
    provider: Arc<dyn LookupProvider>,
}

impl ProxyGateway {
    pub fn new(
        config: Arc<RwLock<Config>>,
        store: Store,
        captcha: Arc<dyn CaptchaVerifier>,
        provider: Arc<dyn LookupProvider>,
    ) -> Self {
        Self {
            config,
            store,
            captcha,
            provider,
        }
    }

    /// Origin and CAPTCHA gates shared by lookups and opt-outs.
    async fn check_access(
        &self,
        origin: Option<&str>,
        referer: Option<&str>,
        captcha_token: Option<&str>,
        client_key: &str,
    ) -> Result<(), DenyReason> {
        let (canonical_domain, dev_hosts) = {
            let config = self.config.read().await;
            (
                config.security.canonical_domain.clone(),
                config.security.allowed_dev_hosts.clone(),
            )
        };

        if !source_allowed(origin, referer, &canonical_domain, &dev_hosts) {
            return Err(DenyReason::DomainNotAllowed);
        }

        let Some(token) = captcha_token.filter(|t| !t.is_empty()) else {
            return Err(DenyReason::MissingToken);
        };

        if !self.captcha.verify(token, Some(client_key)).await {
            warn!("CAPTCHA verification failed for {}", client_key);
            return Err(DenyReason::InvalidToken);
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Gateway for ProxyGateway {
    async fn handle(&self, request: &LookupRequest) -> LookupOutcome {
        if let Err(reason) = self
            .check_access(
                request.origin.as_deref(),
                request.referer.as_deref(),
                request.captcha_token.as_deref(),
                &request.client_key,
            )
            .await
        {
            return LookupOutcome::Denied(reason);
        }

        let (daily_limit, count_empty_results) = {
            let config = self.config.read().await;
            (
                config.security.daily_lookup_limit,
                config.security.count_empty_results,
            )
        };

        let today = chrono::Utc::now().date_naive();

        // Quota read and suppression read either both apply or, when the
        // store is unreachable, are both skipped and the request proceeds
        // unmetered. Availability wins over strict enforcement here.
        let store_reachable = match self.store.get_quota_count(&request.client_key, today).await {
            Ok(count) if count >= daily_limit => {
                info!(
                    "Rate limit hit for {} ({}/{})",
                    request.client_key, count, daily_limit
                );
                return LookupOutcome::RateLimited;
            }
            Ok(_) => match self.store.is_suppressed(&request.value).await {
                Ok(true) => return LookupOutcome::NoData,
                Ok(false) => true,
                Err(e) => {
                    warn!("Suppression check skipped: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Usage check skipped: {}", e);
                false
            }
        };

        let response = match self.provider.lookup(request.kind, &request.value).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Upstream request failed: {}", e);
                return LookupOutcome::UpstreamError(502);
            }
        };

        if !(200..300).contains(&response.status) {
            return LookupOutcome::UpstreamError(response.status);
        }

        // Failed calls are free; only a successful provider response consumes
        // quota, and only once. Empty-but-successful responses count unless
        // the operator opted out of that.
        let counts = count_empty_results || !payload_indicates_empty(&response.payload);
        if store_reachable && counts {
            if let Err(e) = self.store.increment_quota(&request.client_key, today).await {
                warn!("Quota increment failed for {}: {}", request.client_key, e);
            }
        }

        LookupOutcome::Success(response.payload)
    }

    async fn suppress(&self, request: &OptOutRequest) -> Result<(), GatewayError> {
        self.check_access(
            request.origin.as_deref(),
            request.referer.as_deref(),
            request.captcha_token.as_deref(),
            &request.client_key,
        )
        .await?;

        self.store
            .add_suppression(request.value.trim(), request.kind.as_str())
            .await
            .map_err(|e| GatewayError::Store(e.to_string()))?;

        info!("Suppression added ({})", request.kind);
        Ok(())
    }
}

/// A declared source is acceptable when its host is the canonical domain, a
/// subdomain of it, or a listed development host. A request with neither
/// origin nor referrer is untrusted, not same-origin.
fn source_allowed(
    origin: Option<&str>,
    referer: Option<&str>,
    canonical_domain: &str,
    dev_hosts: &[String],
) -> bool {
    if origin.is_none() && referer.is_none() {
        return false;
    }

    for source in [origin, referer].into_iter().flatten() {
        let Ok(parsed) = url::Url::parse(source) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        if !host_allowed(host, canonical_domain, dev_hosts) {
            return false;
        }
    }

    true
}

fn host_allowed(host: &str, canonical_domain: &str, dev_hosts: &[String]) -> bool {
    if host == canonical_domain {
        return true;
    }
    if host
        .strip_suffix(canonical_domain)
        .is_some_and(|prefix| prefix.ends_with('.'))
    {
        return true;
    }
    dev_hosts.iter().any(|dev| dev == host)
}
