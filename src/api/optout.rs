use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{ApiError, AppState, validation};
use crate::constants::headers;
use crate::services::gateway::{GatewayError, OptOutRequest};

#[derive(Debug, Deserialize)]
pub struct OptOutBody {
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// POST `/api/hide` takes "hide my data" submissions. Gated by the same origin
/// and CAPTCHA checks as lookups; insertion is idempotent on the value.
pub async fn hide(
    State(state): State<Arc<AppState>>,
    header_map: HeaderMap,
    Json(body): Json<OptOutBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let value = body
        .value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation("Missing value or type"))?;

    let kind = body
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::validation("Missing value or type"))?;
    let kind = validation::parse_kind(kind)?;

    let request = OptOutRequest {
        kind,
        value: value.to_string(),
        client_key: validation::client_key(&header_map),
        captcha_token: validation::header_value(&header_map, headers::CAPTCHA_TOKEN)
            .map(ToString::to_string),
        origin: validation::header_value(&header_map, "origin").map(ToString::to_string),
        referer: validation::header_value(&header_map, "referer").map(ToString::to_string),
    };

    match state.gateway().suppress(&request).await {
        Ok(()) => Ok(Json(json!({
            "success": true,
            "message": "Request processed successfully."
        }))),
        Err(GatewayError::Denied(reason)) => Err(reason.into()),
        Err(GatewayError::Store(e)) => Err(ApiError::internal(e)),
    }
}
