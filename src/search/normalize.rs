//! Post-processing of a raw provider payload into a display-ready result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::services::gateway::LookupKind;

/// Indian postal codes are six digits; used as the geocoding fallback token.
static PINCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{6}\b").expect("valid regex"));

/// Leading guardian-name prefix ("S/O Ramesh, ...") that confuses geocoders.
static GUARDIAN_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^s/o.*?,\s*").expect("valid regex"));

/// The normalized, geocoded, display-ready representation of one lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResult {
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub name: String,
    pub address: String,
    pub carrier: Option<String>,
    pub location: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Provider addresses use `!` as a field separator. Split, trim, drop empty
/// segments, rejoin. Absent or blank addresses become the literal `"N/A"`.
/// Idempotent: a string without `!` comes back unchanged.
#[must_use]
pub fn normalize_address(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return "N/A".to_string();
    };

    raw.split('!')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Picks the best candidate string for geocoding, in priority order: the
/// normalized address, then the secondary location field (unless it is the
/// country-wide default), then the circle code. Returns the cleaned query.
#[must_use]
pub fn geocode_query(address: &str, location: &str, circle: Option<&str>) -> Option<String> {
    let candidate = if !address.is_empty() && address != "N/A" {
        address
    } else if !location.is_empty() && location != "India" {
        location
    } else {
        circle.filter(|c| !c.is_empty())?
    };

    let cleaned = GUARDIAN_PREFIX.replace(candidate, "");
    Some(cleaned.replace('!', ", "))
}

/// First 6-digit postal code token in the string, if any.
#[must_use]
pub fn extract_pincode(query: &str) -> Option<&str> {
    PINCODE.find(query).map(|m| m.as_str())
}

/// First element of an array payload, else the payload itself.
#[must_use]
pub fn first_item(payload: &Value) -> &Value {
    match payload {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    }
}

fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Builds the final result from a usable provider record. The submitted query
/// value backfills the looked-up field when the record lacks it.
#[must_use]
pub fn assemble_result(
    item: &Value,
    query: &str,
    kind: LookupKind,
    address: String,
    coordinates: Option<(f64, f64)>,
) -> NormalizedResult {
    let circle = str_field(item, "circle");

    let mobile = str_field(item, "mobile")
        .map(ToString::to_string)
        .or_else(|| (kind == LookupKind::Mobile).then(|| query.to_string()));

    let email = str_field(item, "email")
        .map(ToString::to_string)
        .or_else(|| (kind == LookupKind::Email).then(|| query.to_string()));

    let name = str_field(item, "name")
        .or_else(|| str_field(item, "fname"))
        .unwrap_or("Unknown")
        .to_string();

    NormalizedResult {
        mobile,
        email,
        name,
        address,
        carrier: circle.map(ToString::to_string),
        location: circle.unwrap_or("India").to_string(),
        lat: coordinates.map(|(lat, _)| lat),
        lon: coordinates.map(|(_, lon)| lon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_and_trims_address_segments() {
        assert_eq!(
            normalize_address(Some("Flat 2! MG Road! Pune! 411001")),
            "Flat 2, MG Road, Pune, 411001"
        );
        assert_eq!(
            normalize_address(Some(" A !! B !")),
            "A, B"
        );
    }

    #[test]
    fn missing_address_becomes_na() {
        assert_eq!(normalize_address(None), "N/A");
        assert_eq!(normalize_address(Some("")), "N/A");
        assert_eq!(normalize_address(Some("   ")), "N/A");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_address(Some("Flat 2! MG Road! Pune! 411001"));
        let twice = normalize_address(Some(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn query_prefers_address_then_location_then_circle() {
        assert_eq!(
            geocode_query("MG Road, Pune", "Maharashtra", Some("MH")),
            Some("MG Road, Pune".to_string())
        );
        assert_eq!(
            geocode_query("N/A", "Maharashtra", Some("MH")),
            Some("Maharashtra".to_string())
        );
        // The country-wide default is too coarse to geocode.
        assert_eq!(
            geocode_query("N/A", "India", Some("MH")),
            Some("MH".to_string())
        );
        assert_eq!(geocode_query("N/A", "India", None), None);
    }

    #[test]
    fn query_strips_guardian_prefix_and_separators() {
        // The separator swap keeps whatever whitespace followed the `!`.
        assert_eq!(
            geocode_query("S/O Ramesh, MG Road! Pune", "India", None),
            Some("MG Road,  Pune".to_string())
        );
        assert_eq!(
            geocode_query("s/o K Kumar, Anna Nagar", "India", None),
            Some("Anna Nagar".to_string())
        );
    }

    #[test]
    fn finds_first_pincode_token() {
        assert_eq!(extract_pincode("Flat 2, Pune, 411001"), Some("411001"));
        assert_eq!(extract_pincode("411001, then 560001"), Some("411001"));
        assert_eq!(extract_pincode("no codes here"), None);
        // A ten-digit phone number is not a postal code.
        assert_eq!(extract_pincode("9876543210"), None);
    }

    #[test]
    fn assembles_with_name_fallback_chain() {
        let item = json!({ "fname": "Ramesh", "circle": "Maharashtra" });
        let result = assemble_result(&item, "9876543210", LookupKind::Mobile, "N/A".into(), None);
        assert_eq!(result.name, "Ramesh");
        assert_eq!(result.mobile.as_deref(), Some("9876543210"));
        assert_eq!(result.carrier.as_deref(), Some("Maharashtra"));
        assert_eq!(result.location, "Maharashtra");

        let result = assemble_result(&json!({}), "a@b.c", LookupKind::Email, "N/A".into(), None);
        assert_eq!(result.name, "Unknown");
        assert_eq!(result.email.as_deref(), Some("a@b.c"));
        assert!(result.mobile.is_none());
        assert_eq!(result.location, "India");
    }

    #[test]
    fn array_payload_uses_first_element() {
        let payload = json!([{ "name": "A" }, { "name": "B" }]);
        assert_eq!(first_item(&payload)["name"], "A");
        let payload = json!({ "name": "C" });
        assert_eq!(first_item(&payload)["name"], "C");
    }
}
