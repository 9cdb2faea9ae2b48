//! Audit trail: decision records, the sink interface, and SQLite storage.

mod store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error_handling::DatabaseError;
use crate::geo::GeoRecord;
use crate::policy::{Decision, DecisionStatus};

pub use store::{init_db_pool, init_db_pool_with_path, run_migrations, SqliteAuditStore};

/// Which entry point produced an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    FormLoad,
    FormSubmission,
    LocationCheck,
}

impl LogType {
    /// Stable string form persisted in the `log_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::FormLoad => "form_load",
            LogType::FormSubmission => "form_submission",
            LogType::LocationCheck => "location_check",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "form_load" => Some(LogType::FormLoad),
            "form_submission" => Some(LogType::FormSubmission),
            "location_check" => Some(LogType::LocationCheck),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted decision with whatever location data was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Row id; `None` until stored.
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub region_code: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    /// `"allowed"` or `"blocked"`.
    pub status: String,
    /// Machine-readable reason string from the matched stage.
    pub reason: String,
    pub form_id: Option<String>,
    pub log_type: LogType,
}

impl AuditRecord {
    /// Builds a record from an evaluated decision and the geo data (if any)
    /// that informed it.
    pub fn from_decision(
        ip: std::net::IpAddr,
        geo: Option<&GeoRecord>,
        decision: &Decision,
        form_id: Option<String>,
        log_type: LogType,
    ) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            ip_address: ip.to_string(),
            country_code: geo.map(|g| g.country_code.clone()),
            country_name: geo.and_then(|g| g.country_name.clone()),
            region_code: geo.and_then(|g| g.region_code.clone()),
            region_name: geo.and_then(|g| g.region_name.clone()),
            city: geo.and_then(|g| g.city.clone()),
            zip: geo.and_then(|g| g.zip.clone()),
            status: match decision.status {
                DecisionStatus::Allowed => "allowed".to_string(),
                DecisionStatus::Blocked => "blocked".to_string(),
            },
            reason: decision.reason.as_str().to_string(),
            form_id,
            log_type,
        }
    }
}

/// Filters for audit retrieval. Every field is optional; unset fields do not
/// constrain the result.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Inclusive lower bound on record timestamp.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on record timestamp.
    pub to: Option<DateTime<Utc>>,
    /// Substring match on the IP column.
    pub ip_contains: Option<String>,
    /// Exact country code match.
    pub country_code: Option<String>,
    /// Exact region code match.
    pub region_code: Option<String>,
    /// Exact status match (`allowed`/`blocked`).
    pub status: Option<String>,
    /// Substring match on the reason column.
    pub reason_contains: Option<String>,
    /// Exact log-type match.
    pub log_type: Option<LogType>,
}

/// One page of audit results with the unpaginated total.
#[derive(Debug, Clone)]
pub struct AuditPage {
    pub records: Vec<AuditRecord>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Destination for decision records.
///
/// Implementations must be safe to call from the decision path, which fires
/// writes asynchronously and only logs failures.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), DatabaseError>;
}
