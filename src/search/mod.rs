//! Client-side search orchestration: one lookup at a time, driven through
//! staged loading UI with a deep-search deadline and a post-success zoom hold.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::clients::{CheckApiClient, NominatimClient};
use crate::config::GeocoderConfig;
use crate::constants::intervals;
use crate::services::gateway::{Geocoder, LookupKind, payload_indicates_empty, payload_message};

pub mod normalize;
pub use normalize::NormalizedResult;

/// Presentational stage of the active search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStage {
    Idle,
    Simple,
    Deep,
    Zooming,
}

/// UI-facing signals emitted over the event bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SearchEvent {
    Stage(SearchStage),
    RateLimited,
    Failed { message: String },
    ResultReady(NormalizedResult),
}

/// The gateway as seen from the client side: one call, raw JSON back.
/// A 429 comes back as a payload with `rateLimit: true`, mirroring the wire.
#[async_trait::async_trait]
pub trait LookupBackend: Send + Sync {
    async fn check(
        &self,
        value: &str,
        kind: LookupKind,
        token: Option<&str>,
    ) -> anyhow::Result<Value>;
}

struct Inner {
    backend: Arc<dyn LookupBackend>,
    geocoder: Arc<dyn Geocoder>,
    events: broadcast::Sender<SearchEvent>,

    /// Bumped on every submit. Scheduled callbacks compare against it before
    /// touching state, so a stale timer from a superseded session is a no-op
    /// even if it has already fired.
    generation: AtomicU64,

    stage: std::sync::Mutex<SearchStage>,
    result: std::sync::Mutex<Option<NormalizedResult>>,
}

impl Inner {
    fn current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_stage(&self, stage: SearchStage) {
        *self.stage.lock().expect("stage lock") = stage;
        let _ = self.events.send(SearchEvent::Stage(stage));
    }
}

/// Drives one user-initiated lookup from submission to a terminal outcome.
/// A new `submit` supersedes any in-flight session.
#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<Inner>,
}

impl SearchOrchestrator {
    /// Production wiring: the gateway over HTTP and Nominatim for geocoding,
    /// sharing one connection pool.
    pub fn over_http(client: reqwest::Client, gateway_base_url: String, config: &GeocoderConfig) -> Self {
        let backend = Arc::new(CheckApiClient::with_shared_client(
            client.clone(),
            gateway_base_url,
        )) as Arc<dyn LookupBackend>;
        let geocoder = Arc::new(NominatimClient::with_shared_client(
            client,
            config.base_url.clone(),
        )) as Arc<dyn Geocoder>;
        Self::new(backend, geocoder)
    }

    pub fn new(backend: Arc<dyn LookupBackend>, geocoder: Arc<dyn Geocoder>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                backend,
                geocoder,
                events,
                generation: AtomicU64::new(0),
                stage: std::sync::Mutex::new(SearchStage::Idle),
                result: std::sync::Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn stage(&self) -> SearchStage {
        *self.inner.stage.lock().expect("stage lock")
    }

    /// Last committed result, retained across the return to `Idle`.
    #[must_use]
    pub fn result(&self) -> Option<NormalizedResult> {
        self.inner.result.lock().expect("result lock").clone()
    }

    /// Runs one lookup. Resolves once the session reaches `Zooming` (success)
    /// or `Idle` (failure); the zoom hold completes in the background under
    /// the same session guard.
    pub async fn submit(&self, query: &str, kind: LookupKind, token: Option<&str>) {
        let inner = &self.inner;
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        *inner.result.lock().expect("result lock") = None;
        inner.set_stage(SearchStage::Simple);

        // Deep-search deadline: purely presentational, the lookup itself
        // continues unaffected.
        let deadline_inner = inner.clone();
        tokio::spawn(async move {
            sleep(intervals::DEEP_SEARCH_DEADLINE).await;
            if deadline_inner.current(generation)
                && *deadline_inner.stage.lock().expect("stage lock") == SearchStage::Simple
            {
                deadline_inner.set_stage(SearchStage::Deep);
            }
        });

        let reply = inner.backend.check(query, kind, token).await;

        if !inner.current(generation) {
            debug!("Discarding reply for superseded search session");
            return;
        }

        let payload = match reply {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Lookup request failed: {}", e);
                self.fail(generation, "No data found or API error.".to_string());
                return;
            }
        };

        if payload.get("rateLimit").and_then(Value::as_bool) == Some(true) {
            if inner.current(generation) {
                inner.set_stage(SearchStage::Idle);
                let _ = inner.events.send(SearchEvent::RateLimited);
            }
            return;
        }

        if payload_indicates_empty(&payload) {
            self.fail(generation, payload_message(&payload));
            return;
        }

        let item = normalize::first_item(&payload);
        let address = normalize::normalize_address(item.get("address").and_then(Value::as_str));
        let coordinates = self.resolve_coordinates(item, &address).await;

        // Geocoding awaited above is a suspension point; only the newest
        // session may commit its result.
        if !inner.current(generation) {
            debug!("Discarding post-processed result for superseded session");
            return;
        }

        let result = normalize::assemble_result(item, query, kind, address, coordinates);

        *inner.result.lock().expect("result lock") = Some(result.clone());
        inner.set_stage(SearchStage::Zooming);

        // Fixed hold so the map centering animation plays out before the
        // result sheet opens.
        let hold_inner = inner.clone();
        tokio::spawn(async move {
            sleep(intervals::ZOOM_HOLD).await;
            if !hold_inner.current(generation) {
                return;
            }
            let _ = hold_inner.events.send(SearchEvent::ResultReady(result));
            hold_inner.set_stage(SearchStage::Idle);
        });
    }

    fn fail(&self, generation: u64, message: String) {
        if !self.inner.current(generation) {
            return;
        }
        self.inner.set_stage(SearchStage::Idle);
        let _ = self.inner.events.send(SearchEvent::Failed { message });
    }

    /// Geocodes the best candidate string, falling back to a bare postal code
    /// when the full string finds nothing. Both missing means no coordinates.
    async fn resolve_coordinates(&self, item: &Value, address: &str) -> Option<(f64, f64)> {
        let location = item
            .get("circle")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("India");
        let circle = item.get("circle").and_then(Value::as_str);

        let query = normalize::geocode_query(address, location, circle)?;

        match self.inner.geocoder.search(&query).await {
            Ok(Some(coordinates)) => return Some(coordinates),
            Ok(None) => {}
            Err(e) => {
                warn!("Geocoding failed for candidate string: {}", e);
                return None;
            }
        }

        let pincode = normalize::extract_pincode(&query)?;
        match self.inner.geocoder.search(pincode).await {
            Ok(coordinates) => coordinates,
            Err(e) => {
                warn!("Pincode geocoding failed: {}", e);
                None
            }
        }
    }
}
