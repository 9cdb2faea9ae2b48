//! geo_gate library: geolocation-based access decisions for form traffic
//!
//! This library decides whether a request may load or submit a form based on
//! where it comes from: IP whitelist/blacklist, per-IP rate limiting, and
//! country/state/zip restrictions backed by a geolocation provider with a
//! TTL cache. Every decision can be persisted to a SQLite audit log.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use geo_gate::{
//!     ClientRequest, GeoGate, GeoResolver, HttpGeoProvider, InMemoryGeoCache, PolicyConfig,
//! };
//! use geo_gate::initialization::init_client;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PolicyConfig::default().with_approved_countries(["US", "CA"]);
//! let client = init_client()?;
//! let provider = HttpGeoProvider::new(client, &config.api_base_url, &config.api_key);
//! let resolver = GeoResolver::new(Arc::new(InMemoryGeoCache::new()), Arc::new(provider));
//! let gate = GeoGate::new(config, resolver, None);
//!
//! let request = ClientRequest::from_addr("203.0.113.9".parse()?);
//! let outcome = gate.check_submission(&request, Some("5")).await;
//! println!("{}: {}", outcome.ip, outcome.decision.reason);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime: geolocation lookups and audit
//! writes are async.

pub mod audit;
pub mod config;
mod error_handling;
mod gate;
mod geo;
pub mod initialization;
mod ip;
mod policy;
mod rate;
pub mod render;

// Re-export public API
pub use audit::{AuditPage, AuditQuery, AuditRecord, AuditSink, LogType, SqliteAuditStore};
pub use config::{load_policy_file, LogFormat, LogLevel, PolicyConfig, RateLimitConfig};
pub use error_handling::{DatabaseError, InitializationError};
pub use gate::{GateOutcome, GeoGate};
pub use geo::{GeoCache, GeoLookup, GeoRecord, GeoResolver, HttpGeoProvider, InMemoryGeoCache};
pub use ip::{is_private_or_reserved, resolve_client_ip, ClientRequest};
pub use policy::{evaluate, Decision, DecisionStatus, ReasonCode, Stage};
pub use rate::RateLimiter;
