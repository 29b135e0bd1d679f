use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use leakcheck::search::{LookupBackend, SearchEvent, SearchOrchestrator, SearchStage};
use leakcheck::services::gateway::{Geocoder, LookupKind};
use tokio::sync::broadcast;

struct DelayedBackend {
    delay: Duration,
    reply: anyhow::Result<Value>,
}

impl DelayedBackend {
    fn ok(delay: Duration, reply: Value) -> Arc<Self> {
        Arc::new(Self {
            delay,
            reply: Ok(reply),
        })
    }

    fn failing(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            reply: Err(anyhow::anyhow!("connection reset")),
        })
    }
}

#[async_trait::async_trait]
impl LookupBackend for DelayedBackend {
    async fn check(
        &self,
        _value: &str,
        _kind: LookupKind,
        _token: Option<&str>,
    ) -> anyhow::Result<Value> {
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Ok(value) => Ok(value.clone()),
            Err(e) => Err(anyhow::anyhow!("{e}")),
        }
    }
}

/// Geocoder that records its queries and answers full strings and bare
/// pincodes differently.
struct ScriptedGeocoder {
    full: Option<(f64, f64)>,
    pincode: Option<(f64, f64)>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedGeocoder {
    fn new(full: Option<(f64, f64)>, pincode: Option<(f64, f64)>) -> Arc<Self> {
        Arc::new(Self {
            full,
            pincode,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Geocoder for ScriptedGeocoder {
    async fn search(&self, query: &str) -> anyhow::Result<Option<(f64, f64)>> {
        self.queries.lock().unwrap().push(query.to_string());
        let is_pincode = query.len() == 6 && query.chars().all(|c| c.is_ascii_digit());
        Ok(if is_pincode { self.pincode } else { self.full })
    }
}

fn success_payload() -> Value {
    json!({
        "status": true,
        "mobile": "9876543210",
        "name": "Test User",
        "address": "Flat 2! MG Road! Pune! 411001",
        "circle": "Maharashtra"
    })
}

/// Drains events until the session returns to `Idle`, collecting the stage
/// sequence along the way.
async fn collect_until_idle(
    rx: &mut broadcast::Receiver<SearchEvent>,
) -> (Vec<SearchStage>, Vec<SearchEvent>) {
    let mut stages = Vec::new();
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("event stream stalled")
            .expect("event bus closed");
        if let SearchEvent::Stage(stage) = &event {
            stages.push(*stage);
        }
        let done = event == SearchEvent::Stage(SearchStage::Idle);
        events.push(event);
        if done {
            return (stages, events);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn fast_lookup_skips_the_deep_stage() {
    let backend = DelayedBackend::ok(Duration::from_secs(2), success_payload());
    let geocoder = ScriptedGeocoder::new(Some((18.52, 73.85)), None);
    let orchestrator = SearchOrchestrator::new(backend, geocoder);

    let mut rx = orchestrator.subscribe();
    orchestrator
        .submit("9876543210", LookupKind::Mobile, Some("tok"))
        .await;

    let (stages, events) = collect_until_idle(&mut rx).await;
    assert_eq!(
        stages,
        vec![SearchStage::Simple, SearchStage::Zooming, SearchStage::Idle]
    );

    let result = events
        .iter()
        .find_map(|e| match e {
            SearchEvent::ResultReady(result) => Some(result.clone()),
            _ => None,
        })
        .expect("no result emitted");

    assert_eq!(result.address, "Flat 2, MG Road, Pune, 411001");
    assert_eq!(result.name, "Test User");
    assert_eq!(result.carrier.as_deref(), Some("Maharashtra"));
    assert_eq!(result.lat, Some(18.52));
    assert_eq!(orchestrator.stage(), SearchStage::Idle);
    assert!(orchestrator.result().is_some());
}

#[tokio::test(start_paused = true)]
async fn slow_lookup_passes_through_the_deep_stage() {
    let backend = DelayedBackend::ok(Duration::from_secs(9), success_payload());
    let geocoder = ScriptedGeocoder::new(Some((18.52, 73.85)), None);
    let orchestrator = SearchOrchestrator::new(backend, geocoder);

    let mut rx = orchestrator.subscribe();
    orchestrator
        .submit("9876543210", LookupKind::Mobile, Some("tok"))
        .await;

    let (stages, _) = collect_until_idle(&mut rx).await;
    assert_eq!(
        stages,
        vec![
            SearchStage::Simple,
            SearchStage::Deep,
            SearchStage::Zooming,
            SearchStage::Idle
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn rate_limited_reply_raises_the_panel_signal() {
    let backend = DelayedBackend::ok(Duration::from_secs(1), json!({ "rateLimit": true }));
    let geocoder = ScriptedGeocoder::new(None, None);
    let orchestrator = SearchOrchestrator::new(backend, geocoder);

    let mut rx = orchestrator.subscribe();
    orchestrator
        .submit("9876543210", LookupKind::Mobile, Some("tok"))
        .await;

    let mut saw_rate_limit = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            SearchEvent::RateLimited => saw_rate_limit = true,
            SearchEvent::ResultReady(_) | SearchEvent::Failed { .. } => {
                panic!("unexpected terminal event: {event:?}")
            }
            SearchEvent::Stage(_) => {}
        }
    }

    assert!(saw_rate_limit);
    assert_eq!(orchestrator.stage(), SearchStage::Idle);
    assert!(orchestrator.result().is_none());
}

#[tokio::test(start_paused = true)]
async fn empty_payload_fails_with_provider_message() {
    let backend = DelayedBackend::ok(
        Duration::from_secs(1),
        json!({ "status": false, "message": "nothing here" }),
    );
    let geocoder = ScriptedGeocoder::new(None, None);
    let orchestrator = SearchOrchestrator::new(backend, geocoder);

    let mut rx = orchestrator.subscribe();
    orchestrator
        .submit("9876543210", LookupKind::Mobile, Some("tok"))
        .await;

    let mut message = None;
    while let Ok(event) = rx.try_recv() {
        if let SearchEvent::Failed { message: m } = event {
            message = Some(m);
        }
    }

    assert_eq!(message.as_deref(), Some("nothing here"));
    assert!(orchestrator.result().is_none());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_collapses_to_a_single_error() {
    let backend = DelayedBackend::failing(Duration::from_secs(1));
    let geocoder = ScriptedGeocoder::new(None, None);
    let orchestrator = SearchOrchestrator::new(backend, geocoder);

    let mut rx = orchestrator.subscribe();
    orchestrator
        .submit("9876543210", LookupKind::Mobile, Some("tok"))
        .await;

    let mut message = None;
    while let Ok(event) = rx.try_recv() {
        if let SearchEvent::Failed { message: m } = event {
            message = Some(m);
        }
    }

    assert_eq!(message.as_deref(), Some("No data found or API error."));
    assert_eq!(orchestrator.stage(), SearchStage::Idle);
}

#[tokio::test(start_paused = true)]
async fn geocoding_falls_back_to_the_postal_code() {
    let backend = DelayedBackend::ok(Duration::from_secs(1), success_payload());
    let geocoder = ScriptedGeocoder::new(None, Some((18.0, 73.0)));
    let orchestrator = SearchOrchestrator::new(backend, geocoder.clone());

    let mut rx = orchestrator.subscribe();
    orchestrator
        .submit("9876543210", LookupKind::Mobile, Some("tok"))
        .await;

    collect_until_idle(&mut rx).await;

    assert_eq!(
        geocoder.queries(),
        vec![
            "Flat 2, MG Road, Pune, 411001".to_string(),
            "411001".to_string()
        ]
    );

    let result = orchestrator.result().expect("no result retained");
    assert_eq!(result.lat, Some(18.0));
    assert_eq!(result.lon, Some(73.0));
}

#[tokio::test]
async fn http_wiring_starts_idle() {
    let orchestrator = SearchOrchestrator::over_http(
        reqwest::Client::new(),
        "http://127.0.0.1:8710".to_string(),
        &leakcheck::config::GeocoderConfig::default(),
    );
    assert_eq!(orchestrator.stage(), SearchStage::Idle);
    assert!(orchestrator.result().is_none());
}

/// Backend whose delay and reply depend on the queried value, so two
/// overlapping sessions resolve at different times with different payloads.
struct RoutedBackend {
    routes: std::collections::HashMap<String, (Duration, Value)>,
}

#[async_trait::async_trait]
impl LookupBackend for RoutedBackend {
    async fn check(
        &self,
        value: &str,
        _kind: LookupKind,
        _token: Option<&str>,
    ) -> anyhow::Result<Value> {
        let (delay, reply) = self
            .routes
            .get(value)
            .ok_or_else(|| anyhow::anyhow!("unknown test value: {value}"))?;
        tokio::time::sleep(*delay).await;
        Ok(reply.clone())
    }
}

#[tokio::test(start_paused = true)]
async fn new_submit_supersedes_a_pending_session() {
    let mut routes = std::collections::HashMap::new();
    routes.insert(
        "1111111111".to_string(),
        (
            Duration::from_secs(5),
            json!({ "status": true, "name": "First Session", "circle": "Delhi" }),
        ),
    );
    routes.insert(
        "2222222222".to_string(),
        (
            Duration::from_secs(1),
            json!({ "status": true, "name": "Second Session", "circle": "Pune" }),
        ),
    );

    let backend = Arc::new(RoutedBackend { routes });
    let geocoder = ScriptedGeocoder::new(Some((28.6, 77.2)), None);
    let orchestrator = SearchOrchestrator::new(backend, geocoder);
    let mut rx = orchestrator.subscribe();

    let first = orchestrator.clone();
    let first_handle = tokio::spawn(async move {
        first.submit("1111111111", LookupKind::Mobile, Some("tok")).await;
    });

    tokio::time::sleep(Duration::from_secs(1)).await;

    orchestrator
        .submit("2222222222", LookupKind::Mobile, Some("tok"))
        .await;

    // Let the first session's backend reply, its deep-search deadline, and
    // every zoom-hold timer fire.
    tokio::time::sleep(Duration::from_secs(30)).await;
    first_handle.await.unwrap();

    // The first session's late reply and stale timers must not have
    // overwritten the second session's committed result.
    let result = orchestrator.result().expect("second session result lost");
    assert_eq!(result.name, "Second Session");
    assert_eq!(result.mobile.as_deref(), Some("2222222222"));
    assert_eq!(orchestrator.stage(), SearchStage::Idle);

    while let Ok(event) = rx.try_recv() {
        if let SearchEvent::ResultReady(r) = event {
            assert_eq!(r.name, "Second Session");
        }
    }
}
