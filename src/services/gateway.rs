//! Domain types and collaborator traits for the lookup gateway.
//!
//! The gateway sits between the public API surface and the upstream data
//! provider, and is the only place quota and suppression policy lives.
//! Collaborators are trait objects so tests can swap in mocks.

use serde_json::Value;
use thiserror::Error;

/// What kind of identifier a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Mobile,
    Email,
}

impl LookupKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for LookupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One incoming lookup, immutable once constructed.
#[derive(Debug, Clone)]
pub struct LookupRequest {
    pub kind: LookupKind,
    pub value: String,

    /// Quota key derived from the client network address.
    pub client_key: String,

    pub captcha_token: Option<String>,

    /// Declared `Origin` header, if any.
    pub origin: Option<String>,

    /// Declared `Referer` header, if any.
    pub referer: Option<String>,
}

/// Opt-out submission gated by the same origin and CAPTCHA checks.
#[derive(Debug, Clone)]
pub struct OptOutRequest {
    pub kind: LookupKind,
    pub value: String,
    pub client_key: String,
    pub captcha_token: Option<String>,
    pub origin: Option<String>,
    pub referer: Option<String>,
}

/// Why a request was refused before reaching the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("Access Denied: Domain not allowed")]
    DomainNotAllowed,

    #[error("Access Denied: Missing CAPTCHA token")]
    MissingToken,

    #[error("Access Denied: Invalid CAPTCHA")]
    InvalidToken,
}

/// Terminal outcome of one lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Raw provider payload, passed through untouched.
    Success(Value),

    /// Either the provider found nothing or the value is suppressed; the two
    /// are deliberately indistinguishable.
    NoData,

    RateLimited,

    Denied(DenyReason),

    /// Provider transport or status failure. Never consumes quota.
    UpstreamError(u16),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Denied(#[from] DenyReason),

    #[error("Store error: {0}")]
    Store(String),
}

/// Provider response before the gateway interprets it.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub payload: Value,
}

/// Validates a client-submitted challenge token. Verification failures and
/// transport errors both read as "not verified".
#[async_trait::async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, client_ip: Option<&str>) -> bool;
}

/// The upstream identity/location data provider.
#[async_trait::async_trait]
pub trait LookupProvider: Send + Sync {
    /// Transport-level failures come back as `Err`; HTTP-level failures as a
    /// non-2xx `status` in the response.
    async fn lookup(&self, kind: LookupKind, value: &str) -> anyhow::Result<ProviderResponse>;
}

/// Resolves a free-form query string to display coordinates.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Option<(f64, f64)>>;
}

/// The request gateway: every public lookup goes through `handle`, every
/// opt-out through `suppress`.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Runs the full check sequence and, if all checks pass, delegates to the
    /// provider. Never returns `Err`; all failures are encoded in the outcome.
    async fn handle(&self, request: &LookupRequest) -> LookupOutcome;

    /// Adds a value to the opt-out registry after the origin and CAPTCHA
    /// gates.
    async fn suppress(&self, request: &OptOutRequest) -> Result<(), GatewayError>;
}

/// True when a structurally successful provider payload carries no usable
/// record: missing item, `status: false`, or `status: "failed"`.
#[must_use]
pub fn payload_indicates_empty(payload: &Value) -> bool {
    let item = match payload {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return true,
        },
        Value::Null => return true,
        other => other,
    };

    match item.get("status") {
        Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s == "failed",
        _ => false,
    }
}

/// Message shown to the user for an empty or failed payload.
#[must_use]
pub fn payload_message(payload: &Value) -> String {
    let item = match payload {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };

    item.get("message")
        .and_then(Value::as_str)
        .map_or_else(|| "No data found.".to_string(), ToString::to_string)
}
