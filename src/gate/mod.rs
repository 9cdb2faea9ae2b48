//! Decision orchestration.
//!
//! [`GeoGate`] wires the pipeline together for one configured deployment:
//! client-IP resolution, geolocation, policy evaluation, and audit. The
//! three entry points differ only in audit log type and whether the request
//! counts against the rate limit; submissions do, page loads and standalone
//! location checks do not.

use std::sync::Arc;

use crate::audit::{AuditRecord, AuditSink, LogType};
use crate::config::PolicyConfig;
use crate::geo::{GeoRecord, GeoResolver};
use crate::ip::{resolve_client_ip, ClientRequest};
use crate::policy::{evaluate, Decision};
use crate::rate::RateLimiter;

/// Result of one gate check: the resolved client IP, whatever location data
/// was found, and the decision.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub ip: std::net::IpAddr,
    pub geo: Option<GeoRecord>,
    pub decision: Decision,
}

impl GateOutcome {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

/// One configured decision engine instance.
pub struct GeoGate {
    config: PolicyConfig,
    resolver: GeoResolver,
    limiter: RateLimiter,
    sink: Option<Arc<dyn AuditSink>>,
}

impl GeoGate {
    pub fn new(
        config: PolicyConfig,
        resolver: GeoResolver,
        sink: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        let limiter = RateLimiter::new(&config.rate_limit);
        Self {
            config,
            resolver,
            limiter,
            sink,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Checks whether a form may be rendered for this request. Does not
    /// count against the rate limit; rendering a page is not a submission
    /// attempt.
    pub async fn check_form_load(
        &self,
        request: &ClientRequest,
        form_id: Option<&str>,
    ) -> GateOutcome {
        self.check(request, form_id, LogType::FormLoad, false).await
    }

    /// Checks whether a submission may be accepted. Counts against the
    /// per-IP rate limit.
    pub async fn check_submission(
        &self,
        request: &ClientRequest,
        form_id: Option<&str>,
    ) -> GateOutcome {
        self.check(request, form_id, LogType::FormSubmission, true)
            .await
    }

    /// Standalone location check, used for diagnostics and ad-hoc lookups.
    /// Does not count against the rate limit.
    pub async fn check_location(&self, request: &ClientRequest) -> GateOutcome {
        self.check(request, None, LogType::LocationCheck, false)
            .await
    }

    /// Replaces any form shortcode or markup in `content` with the
    /// configured block message. Applied server-side after a blocked
    /// form-load decision so form markup never reaches the client.
    pub fn render_blocked_content(&self, content: &str) -> String {
        crate::render::replace_forms_with_message(content, &self.config.blocked_message)
    }

    async fn check(
        &self,
        request: &ClientRequest,
        form_id: Option<&str>,
        log_type: LogType,
        rate_limited: bool,
    ) -> GateOutcome {
        let ip = resolve_client_ip(request, &self.config.trusted_proxies);
        let geo = self.resolver.resolve(ip).await;

        let limiter = rate_limited.then_some(&self.limiter);
        let decision = evaluate(&self.config, ip, geo.as_ref(), limiter);

        log::info!(
            "{} from {ip}: {} ({})",
            log_type,
            match decision.status {
                crate::policy::DecisionStatus::Allowed => "allowed",
                crate::policy::DecisionStatus::Blocked => "blocked",
            },
            decision.reason
        );

        self.audit(ip, geo.as_ref(), &decision, form_id, log_type);

        GateOutcome { ip, geo, decision }
    }

    /// Fires the audit write without blocking the decision path. Failures
    /// are logged and never surface to the caller.
    fn audit(
        &self,
        ip: std::net::IpAddr,
        geo: Option<&GeoRecord>,
        decision: &Decision,
        form_id: Option<&str>,
        log_type: LogType,
    ) {
        if !self.config.log_enabled {
            return;
        }
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let record =
            AuditRecord::from_decision(ip, geo, decision, form_id.map(str::to_string), log_type);
        tokio::spawn(async move {
            if let Err(e) = sink.record(record).await {
                log::warn!("Failed to write audit record: {e}");
            }
        });
    }
}
