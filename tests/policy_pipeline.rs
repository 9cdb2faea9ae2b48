//! End-to-end pipeline tests through the public library API.
//!
//! Exercises the full decision path (IP resolution, geolocation with cache,
//! rate limiting, policy precedence, audit) using a stub geolocation
//! provider so no network is involved.

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use geo_gate::{
    ClientRequest, GeoGate, GeoLookup, GeoRecord, GeoResolver, InMemoryGeoCache, PolicyConfig,
    RateLimitConfig, ReasonCode,
};

/// Stub provider serving a fixed record per country, counting lookups.
struct StubProvider {
    record: Option<GeoRecord>,
    calls: AtomicUsize,
}

impl StubProvider {
    fn serving(record: Option<GeoRecord>) -> Arc<Self> {
        Arc::new(Self {
            record,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoLookup for StubProvider {
    async fn lookup(&self, _ip: IpAddr) -> Option<GeoRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.record.clone()
    }
}

fn record(country: &str) -> GeoRecord {
    GeoRecord::from_provider_json(&json!({
        "country_code": country,
        "region_code": "MA",
        "zip": "02139"
    }))
    .unwrap()
}

fn gate(config: PolicyConfig, provider: Arc<StubProvider>) -> GeoGate {
    let resolver = GeoResolver::new(Arc::new(InMemoryGeoCache::new()), provider);
    GeoGate::new(config, resolver, None)
}

fn request(ip: &str) -> ClientRequest {
    ClientRequest::from_addr(ip.parse().unwrap())
}

#[tokio::test]
async fn whitelist_overrides_blacklist_rate_limit_and_geography() {
    let mut config = PolicyConfig::default().with_approved_countries(["CA"]);
    config.ip_whitelist.insert("8.8.8.8".to_string());
    config.ip_blacklist.push("8.8.*".to_string());
    config.rate_limit = RateLimitConfig {
        enabled: true,
        window_seconds: 3600,
        max_requests: 1,
    };
    // Provider reports a non-approved country; whitelist must still win.
    let gate = gate(config, StubProvider::serving(Some(record("US"))));

    for _ in 0..5 {
        let outcome = gate.check_submission(&request("8.8.8.8"), None).await;
        assert!(outcome.is_allowed());
        assert_eq!(outcome.decision.reason, ReasonCode::IpWhitelisted);
    }
}

#[tokio::test]
async fn wildcard_blacklist_matches_prefix_only() {
    let mut config = PolicyConfig::default();
    config.ip_blacklist.push("203.0.113.*".to_string());
    let gate = gate(config, StubProvider::serving(Some(record("US"))));

    for blocked in ["203.0.113.5", "203.0.113.254"] {
        let outcome = gate.check_form_load(&request(blocked), None).await;
        assert_eq!(outcome.decision.reason, ReasonCode::IpBlacklisted, "{blocked}");
    }

    let outcome = gate.check_form_load(&request("203.0.114.1"), None).await;
    assert!(outcome.is_allowed());
}

#[tokio::test]
async fn submissions_rate_limit_after_three_in_window() {
    let config = PolicyConfig {
        rate_limit: RateLimitConfig {
            enabled: true,
            window_seconds: 10,
            max_requests: 3,
        },
        ..PolicyConfig::default()
    };
    let gate = gate(config, StubProvider::serving(Some(record("US"))));

    let mut reasons = Vec::new();
    for _ in 0..4 {
        let outcome = gate.check_submission(&request("8.8.8.8"), Some("5")).await;
        reasons.push(outcome.decision.reason);
    }
    assert_eq!(
        reasons,
        vec![
            ReasonCode::LocationAllowed,
            ReasonCode::LocationAllowed,
            ReasonCode::LocationAllowed,
            ReasonCode::RateLimited,
        ]
    );
}

#[tokio::test]
async fn form_loads_never_consume_submission_quota() {
    let config = PolicyConfig {
        rate_limit: RateLimitConfig {
            enabled: true,
            window_seconds: 3600,
            max_requests: 2,
        },
        ..PolicyConfig::default()
    };
    let gate = gate(config, StubProvider::serving(Some(record("US"))));

    for _ in 0..10 {
        assert!(gate.check_form_load(&request("8.8.8.8"), None).await.is_allowed());
        assert!(gate.check_location(&request("8.8.8.8")).await.is_allowed());
    }
    assert!(gate.check_submission(&request("8.8.8.8"), None).await.is_allowed());
    assert!(gate.check_submission(&request("8.8.8.8"), None).await.is_allowed());
    let blocked = gate.check_submission(&request("8.8.8.8"), None).await;
    assert_eq!(blocked.decision.reason, ReasonCode::RateLimited);
}

#[tokio::test]
async fn provider_consulted_at_most_once_per_ip_within_ttl() {
    let provider = StubProvider::serving(Some(record("US")));
    let gate = gate(PolicyConfig::default(), provider.clone());

    for _ in 0..5 {
        assert!(gate.check_form_load(&request("8.8.8.8"), None).await.is_allowed());
    }
    assert_eq!(provider.calls(), 1);

    // A different IP costs one more lookup.
    gate.check_form_load(&request("1.1.1.1"), None).await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn country_restriction_allows_members_blocks_others() {
    let config = PolicyConfig::default().with_approved_countries(["US", "CA"]);

    let us_gate = gate(config.clone(), StubProvider::serving(Some(record("US"))));
    let outcome = us_gate.check_form_load(&request("8.8.8.8"), None).await;
    assert_eq!(outcome.decision.reason, ReasonCode::LocationAllowed);

    let ca_gate = gate(config.clone(), StubProvider::serving(Some(record("CA"))));
    assert!(ca_gate.check_form_load(&request("8.8.8.8"), None).await.is_allowed());

    let gb_gate = gate(config, StubProvider::serving(Some(record("GB"))));
    let outcome = gb_gate.check_form_load(&request("8.8.8.8"), None).await;
    assert_eq!(outcome.decision.reason, ReasonCode::CountryBlocked);
}

#[tokio::test]
async fn empty_approved_sets_allow_any_location() {
    let gate = gate(PolicyConfig::default(), StubProvider::serving(Some(record("ZW"))));
    let outcome = gate.check_form_load(&request("8.8.8.8"), None).await;
    assert!(outcome.is_allowed());
    assert_eq!(outcome.decision.reason, ReasonCode::LocationAllowed);
}

#[tokio::test]
async fn missing_geo_data_fails_closed_unless_diagnostic() {
    let strict = gate(PolicyConfig::default(), StubProvider::serving(None));
    let outcome = strict.check_form_load(&request("8.8.8.8"), None).await;
    assert!(!outcome.is_allowed());
    assert_eq!(outcome.decision.reason, ReasonCode::NoGeoData);

    let diagnostic_config = PolicyConfig {
        diagnostic_mode: true,
        ..PolicyConfig::default()
    };
    let lenient = gate(diagnostic_config, StubProvider::serving(None));
    let outcome = lenient.check_form_load(&request("8.8.8.8"), None).await;
    assert!(outcome.is_allowed());
    assert_eq!(outcome.decision.reason, ReasonCode::DiagnosticOverride);
}

#[tokio::test]
async fn private_ip_never_reaches_provider_and_blocks() {
    let provider = StubProvider::serving(Some(record("US")));
    let gate = gate(PolicyConfig::default(), provider.clone());

    let outcome = gate.check_form_load(&request("10.0.0.5"), None).await;
    assert!(!outcome.is_allowed());
    assert_eq!(outcome.decision.reason, ReasonCode::NoGeoData);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn state_and_zip_stages_apply_in_order() {
    let config = PolicyConfig::default()
        .with_approved_countries(["US"])
        .with_approved_states(["MA"])
        .with_approved_zips(["02139"]);

    // Record matches all three dimensions.
    let gate_ok = gate(config.clone(), StubProvider::serving(Some(record("US"))));
    assert!(gate_ok.check_form_load(&request("8.8.8.8"), None).await.is_allowed());

    // Wrong zip, right state.
    let wrong_zip = GeoRecord::from_provider_json(&json!({
        "country_code": "US",
        "region_code": "MA",
        "zip": "90210"
    }))
    .unwrap();
    let gate_zip = gate(config, StubProvider::serving(Some(wrong_zip)));
    let outcome = gate_zip.check_form_load(&request("8.8.8.8"), None).await;
    assert_eq!(outcome.decision.reason, ReasonCode::ZipBlocked);
}
