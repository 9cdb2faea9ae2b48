//! Policy configuration loading.
//!
//! Parses a JSON policy file into a [`PolicyConfig`] snapshot. Loading is
//! deliberately lenient about list contents: a malformed value inside a list
//! is dropped, and a list of the wrong shape degrades to an empty set for
//! that dimension (allow-all), so a bad config edit can never crash the
//! evaluator. Only unreadable files or top-level JSON syntax errors are
//! reported to the caller.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::constants::API_KEY_ENV;
use crate::config::types::{normalize_code_set, normalize_ip_list, PolicyConfig, RateLimitConfig};

/// On-disk policy file shape. Every field is optional; missing fields take
/// the [`PolicyConfig`] defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PolicyFile {
    approved_countries: ListOrScalar,
    approved_states: ListOrScalar,
    approved_zips: ListOrScalar,
    ip_whitelist: ListOrScalar,
    ip_blacklist: ListOrScalar,
    rate_limit_enabled: Option<bool>,
    rate_limit_window_seconds: Option<u64>,
    rate_limit_max_requests: Option<u32>,
    diagnostic_mode: Option<bool>,
    log_enabled: Option<bool>,
    blocked_message: Option<String>,
    trusted_proxies: ListOrScalar,
    api_base_url: Option<String>,
    api_key: Option<String>,
}

/// Accepts either a JSON array of strings or a single comma-separated
/// string; anything else (numbers, objects) collapses to empty.
#[derive(Debug, Default)]
struct ListOrScalar(Vec<String>);

impl<'de> Deserialize<'de> for ListOrScalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self(match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            serde_json::Value::String(s) => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        }))
    }
}

/// Loads a [`PolicyConfig`] from a JSON file.
///
/// The provider API key may alternatively come from the `GEO_GATE_API_KEY`
/// environment variable; a key in the file takes precedence.
pub fn load_policy_file(path: &Path) -> Result<PolicyConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file {}", path.display()))?;
    let file: PolicyFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse policy file {}", path.display()))?;
    Ok(policy_from_file(file))
}

fn policy_from_file(file: PolicyFile) -> PolicyConfig {
    let defaults = PolicyConfig::default();
    let rate_defaults = RateLimitConfig::default();

    let trusted_proxies = file
        .trusted_proxies
        .0
        .iter()
        .filter_map(|entry| {
            let trimmed = entry.trim();
            match trimmed.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    if !trimmed.is_empty() {
                        log::warn!("Ignoring unparseable trusted proxy entry: {trimmed:?}");
                    }
                    None
                }
            }
        })
        .collect();

    let api_key = file
        .api_key
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| std::env::var(API_KEY_ENV).unwrap_or_default());

    PolicyConfig {
        approved_countries: normalize_code_set(file.approved_countries.0),
        approved_states: normalize_code_set(file.approved_states.0),
        approved_zips: file
            .approved_zips
            .0
            .iter()
            .map(|z| z.trim().to_string())
            .filter(|z| !z.is_empty())
            .collect(),
        ip_whitelist: normalize_ip_list(file.ip_whitelist.0).into_iter().collect(),
        ip_blacklist: normalize_ip_list(file.ip_blacklist.0),
        rate_limit: RateLimitConfig {
            enabled: file.rate_limit_enabled.unwrap_or(rate_defaults.enabled),
            window_seconds: file
                .rate_limit_window_seconds
                .unwrap_or(rate_defaults.window_seconds),
            max_requests: file
                .rate_limit_max_requests
                .unwrap_or(rate_defaults.max_requests),
        },
        diagnostic_mode: file.diagnostic_mode.unwrap_or(defaults.diagnostic_mode),
        log_enabled: file.log_enabled.unwrap_or(defaults.log_enabled),
        blocked_message: file
            .blocked_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.blocked_message),
        trusted_proxies,
        api_base_url: file.api_base_url.unwrap_or(defaults.api_base_url),
        api_key,
    }
}
