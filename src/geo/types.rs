//! Geolocation record types and provider payload normalization.
//!
//! Providers disagree on field names (`region_code` vs `regionName` vs
//! `state`, `zip` vs `postal_code`). [`GeoRecord::from_provider_json`]
//! collapses the known spellings into one canonical shape so the rest of the
//! pipeline never sees provider-specific keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical geolocation record for one IP.
///
/// `country_code` is the only field required for a record to exist at all;
/// everything else is best-effort. Codes are stored uppercase, zip is kept
/// verbatim (prefix matching happens at evaluation time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// Two-letter ISO country code, uppercase.
    pub country_code: String,
    /// Human-readable country name, when the provider supplies one.
    pub country_name: Option<String>,
    /// Region/state code, uppercase (e.g. `CA` for California).
    pub region_code: Option<String>,
    /// Human-readable region/state name.
    pub region_name: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Postal code as reported, untrimmed beyond whitespace.
    pub zip: Option<String>,
    /// When this record was fetched; drives cache expiry.
    pub fetched_at: DateTime<Utc>,
}

impl GeoRecord {
    /// Builds a record from a raw provider response body.
    ///
    /// Returns `None` for any recognizable failure shape: an explicit
    /// `"success": false` envelope, a `"status": "fail"` envelope, or a body
    /// with no usable country code. Unknown extra fields are ignored.
    pub fn from_provider_json(body: &Value) -> Option<Self> {
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return None;
        }
        if body.get("status").and_then(Value::as_str) == Some("fail") {
            return None;
        }

        let country_code = first_string(body, &["country_code", "countryCode"])?;
        let country_code = country_code.trim().to_ascii_uppercase();
        if country_code.is_empty() {
            return None;
        }

        Some(Self {
            country_code,
            country_name: first_string(body, &["country_name", "country"]),
            region_code: first_string(body, &["region_code", "regionCode", "region"])
                .map(|r| r.trim().to_ascii_uppercase()),
            region_name: first_string(
                body,
                &["region_name", "regionName", "state", "subdivision_1_name"],
            ),
            city: first_string(body, &["city"]),
            zip: first_string(body, &["zip", "zip_code", "postal", "postal_code"]),
            fetched_at: Utc::now(),
        })
    }

    /// True when the record was fetched within `ttl` of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        age >= chrono::Duration::zero()
            && age <= chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::MAX)
    }
}

/// First non-empty string value among the candidate keys.
fn first_string(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        body.get(*k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}
