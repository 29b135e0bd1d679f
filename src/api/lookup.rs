use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{ApiError, AppState, validation};
use crate::constants::headers;
use crate::services::gateway::{LookupOutcome, LookupRequest};

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub mobile: Option<String>,
    pub email: Option<String>,
}

/// The public lookup surface: GET `/api/check?mobile=..` or `?email=..`.
/// Suppressed values intentionally share the wire shape of a genuine empty
/// provider result.
pub async fn check(
    State(state): State<Arc<AppState>>,
    header_map: HeaderMap,
    Query(params): Query<CheckParams>,
) -> Result<Response, ApiError> {
    let (kind, value) =
        validation::lookup_target(params.mobile.as_deref(), params.email.as_deref())?;

    let request = LookupRequest {
        kind,
        value,
        client_key: validation::client_key(&header_map),
        captcha_token: validation::header_value(&header_map, headers::CAPTCHA_TOKEN)
            .map(ToString::to_string),
        origin: validation::header_value(&header_map, "origin").map(ToString::to_string),
        referer: validation::header_value(&header_map, "referer").map(ToString::to_string),
    };

    match state.gateway().handle(&request).await {
        LookupOutcome::Success(payload) => Ok(Json(payload).into_response()),
        LookupOutcome::NoData => Ok(Json(json!({
            "status": false,
            "message": "No data found."
        }))
        .into_response()),
        LookupOutcome::RateLimited => Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "rateLimit": true })),
        )
            .into_response()),
        LookupOutcome::Denied(reason) => {
            info!("Lookup denied: {}", reason);
            Err(reason.into())
        }
        LookupOutcome::UpstreamError(status) => Err(ApiError::Upstream(status)),
    }
}

/// GET `/api/health` reports store reachability for operators.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database = state.store().ping().await.is_ok();
    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "database": database,
    }))
}
