//! Policy evaluation pipeline.
//!
//! Runs a fixed precedence chain over one request: whitelist, blacklist,
//! rate limit, geo availability, country, state, zip, allow. The first
//! matching stage decides; later stages are never consulted. Evaluation is
//! pure apart from the rate-limiter increment, which callers opt into by
//! passing a limiter.

use std::net::IpAddr;

use regex::Regex;
use strum_macros::EnumIter;

use crate::config::{PolicyConfig, ZIP_PREFIX_LEN};
use crate::geo::GeoRecord;
use crate::rate::RateLimiter;

/// Terminal outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStatus {
    Allowed,
    Blocked,
}

/// Pipeline stage that produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Whitelist,
    Blacklist,
    RateLimit,
    GeoAvailability,
    Country,
    State,
    Zip,
    Allow,
}

/// Machine-readable reason attached to every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ReasonCode {
    IpWhitelisted,
    IpBlacklisted,
    RateLimited,
    NoGeoData,
    DiagnosticOverride,
    CountryBlocked,
    StateBlocked,
    ZipBlocked,
    LocationAllowed,
}

impl ReasonCode {
    /// Stable string form persisted in audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::IpWhitelisted => "ip_whitelisted",
            ReasonCode::IpBlacklisted => "ip_blacklisted",
            ReasonCode::RateLimited => "rate_limited",
            ReasonCode::NoGeoData => "no_geo_data",
            ReasonCode::DiagnosticOverride => "diagnostic_override",
            ReasonCode::CountryBlocked => "country_blocked",
            ReasonCode::StateBlocked => "state_blocked",
            ReasonCode::ZipBlocked => "zip_blocked",
            ReasonCode::LocationAllowed => "location_allowed",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated decision: outcome, reason, and the stage that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub status: DecisionStatus,
    pub reason: ReasonCode,
    pub stage: Stage,
}

impl Decision {
    fn allowed(reason: ReasonCode, stage: Stage) -> Self {
        Self {
            status: DecisionStatus::Allowed,
            reason,
            stage,
        }
    }

    fn blocked(reason: ReasonCode, stage: Stage) -> Self {
        Self {
            status: DecisionStatus::Blocked,
            reason,
            stage,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.status == DecisionStatus::Allowed
    }
}

/// Evaluates the precedence chain for one request.
///
/// `geo` is the already-resolved location (or `None` when resolution found
/// nothing). Passing a `limiter` enables the rate-limit stage and counts
/// this request against the caller's window; `None` skips that stage
/// entirely, which is how non-submission traffic avoids burning quota.
pub fn evaluate(
    config: &PolicyConfig,
    ip: IpAddr,
    geo: Option<&GeoRecord>,
    limiter: Option<&RateLimiter>,
) -> Decision {
    let ip_str = ip.to_string();

    if config.ip_whitelist.contains(&ip_str) {
        return Decision::allowed(ReasonCode::IpWhitelisted, Stage::Whitelist);
    }

    if blacklist_matches(&config.ip_blacklist, &ip_str) {
        return Decision::blocked(ReasonCode::IpBlacklisted, Stage::Blacklist);
    }

    if config.rate_limit.enabled {
        if let Some(limiter) = limiter {
            if limiter.check_and_increment(ip) {
                return Decision::blocked(ReasonCode::RateLimited, Stage::RateLimit);
            }
        }
    }

    let Some(geo) = geo else {
        // No location data: fail closed, unless diagnostic mode asks for
        // allow-through so operators can debug provider outages live.
        return if config.diagnostic_mode {
            Decision::allowed(ReasonCode::DiagnosticOverride, Stage::GeoAvailability)
        } else {
            Decision::blocked(ReasonCode::NoGeoData, Stage::GeoAvailability)
        };
    };

    if !config.approved_countries.is_empty()
        && !config.approved_countries.contains(&geo.country_code)
    {
        return Decision::blocked(ReasonCode::CountryBlocked, Stage::Country);
    }

    // State and zip restrictions carry US-only semantics; non-US records
    // never reach either stage. A record lacking the relevant field skips
    // that stage rather than failing closed.
    if geo.country_code == "US" {
        if !config.approved_states.is_empty() {
            if let Some(region) = geo.region_code.as_deref() {
                if !config.approved_states.contains(&region.to_ascii_uppercase()) {
                    return Decision::blocked(ReasonCode::StateBlocked, Stage::State);
                }
            }
        }

        if !config.approved_zips.is_empty() {
            if let Some(zip) = geo.zip.as_deref() {
                let prefix: String = zip.chars().take(ZIP_PREFIX_LEN).collect();
                if !config.approved_zips.contains(&prefix) {
                    return Decision::blocked(ReasonCode::ZipBlocked, Stage::Zip);
                }
            }
        }
    }

    Decision::allowed(ReasonCode::LocationAllowed, Stage::Allow)
}

/// Matches an IP string against blacklist entries.
///
/// Entries without `*` are exact string comparisons. Entries with `*` are
/// wildcard patterns: every literal segment is regex-escaped, segments are
/// joined with `.*`, and the whole pattern is anchored, so `203.0.113.*`
/// matches only that octet prefix and dots never act as regex wildcards.
fn blacklist_matches(patterns: &[String], ip_str: &str) -> bool {
    patterns.iter().any(|pattern| {
        if !pattern.contains('*') {
            return pattern == ip_str;
        }
        let escaped = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        match Regex::new(&format!("^{escaped}$")) {
            Ok(re) => re.is_match(ip_str),
            Err(e) => {
                log::warn!("Skipping unusable blacklist pattern {pattern:?}: {e}");
                false
            }
        }
    })
}
