use axum::http::HeaderMap;

use super::ApiError;
use crate::constants::{FALLBACK_CLIENT_KEY, headers};
use crate::services::gateway::LookupKind;

/// Quota key for a request: trusted proxy header first, then the first hop of
/// the forwarded chain, then a fixed fallback so a headerless request still
/// gets metered under one bucket.
pub fn client_key(header_map: &HeaderMap) -> String {
    if let Some(ip) = header_value(header_map, headers::CONNECTING_IP) {
        return ip.to_string();
    }

    if let Some(forwarded) = header_value(header_map, headers::FORWARDED_FOR) {
        if let Some(first_hop) = forwarded.split(',').next().map(str::trim) {
            if !first_hop.is_empty() {
                return first_hop.to_string();
            }
        }
    }

    FALLBACK_CLIENT_KEY.to_string()
}

pub fn header_value<'a>(header_map: &'a HeaderMap, name: &str) -> Option<&'a str> {
    header_map
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Resolves the lookup target from the query parameters. Mobile wins when
/// both are supplied; neither is a malformed request.
pub fn lookup_target(
    mobile: Option<&str>,
    email: Option<&str>,
) -> Result<(LookupKind, String), ApiError> {
    if let Some(mobile) = mobile.map(str::trim).filter(|m| !m.is_empty()) {
        return Ok((LookupKind::Mobile, mobile.to_string()));
    }
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        return Ok((LookupKind::Email, email.to_string()));
    }
    Err(ApiError::validation("Missing mobile or email parameter"))
}

pub fn parse_kind(kind: &str) -> Result<LookupKind, ApiError> {
    match kind {
        "mobile" => Ok(LookupKind::Mobile),
        "email" => Ok(LookupKind::Email),
        other => Err(ApiError::validation(format!(
            "Unknown type: {other}. Expected 'mobile' or 'email'"
        ))),
    }
}
