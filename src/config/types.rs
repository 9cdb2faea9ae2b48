//! Configuration types.
//!
//! Defines the immutable [`PolicyConfig`] snapshot consumed per decision,
//! rate-limit parameters, and logging option enums.

use std::collections::HashSet;
use std::net::IpAddr;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_BLOCKED_MESSAGE, DEFAULT_RATE_LIMIT_MAX_REQUESTS,
    DEFAULT_RATE_LIMIT_WINDOW_SECS,
};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Rate-limit parameters for the submission path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether rate limiting is applied at all.
    pub enabled: bool,
    /// Window length in seconds; counters reset when the window elapses.
    pub window_seconds: u64,
    /// Maximum requests per IP within one window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        }
    }
}

/// Immutable policy snapshot consumed per decision.
///
/// The evaluator never reads configuration from globals; callers fetch or
/// build a `PolicyConfig` outside the hot path and pass it in. An empty
/// `approved_*` set means "allow all" for that dimension.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// ISO country codes, stored uppercase; empty = no country restriction.
    pub approved_countries: HashSet<String>,
    /// Two-letter US state codes, stored uppercase; empty = no state restriction.
    pub approved_states: HashSet<String>,
    /// 5-digit zip prefixes; empty = no zip restriction.
    pub approved_zips: HashSet<String>,
    /// Exact IPs that bypass every other check.
    pub ip_whitelist: HashSet<String>,
    /// Exact IPs or `*`-wildcard patterns that force a block.
    pub ip_blacklist: Vec<String>,
    /// Submission-path throttling parameters.
    pub rate_limit: RateLimitConfig,
    /// When set, missing geo data allows instead of blocking.
    pub diagnostic_mode: bool,
    /// Whether decisions are written to the audit sink.
    pub log_enabled: bool,
    /// Message supplied to the content renderer for blocked forms.
    pub blocked_message: String,
    /// Transport addresses permitted to supply client-IP forwarding headers.
    pub trusted_proxies: HashSet<IpAddr>,
    /// Geolocation provider base URL.
    pub api_base_url: String,
    /// Geolocation provider API key; empty disables provider lookups.
    pub api_key: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            approved_countries: HashSet::new(),
            approved_states: HashSet::new(),
            approved_zips: HashSet::new(),
            ip_whitelist: HashSet::new(),
            ip_blacklist: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            diagnostic_mode: false,
            log_enabled: true,
            blocked_message: DEFAULT_BLOCKED_MESSAGE.to_string(),
            trusted_proxies: HashSet::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: String::new(),
        }
    }
}

impl PolicyConfig {
    /// Replaces the approved-country set from raw list values.
    ///
    /// Entries are trimmed, uppercased, and deduplicated; empty entries are
    /// dropped. Garbage input degrades to an empty set (allow-all), never an
    /// error.
    pub fn with_approved_countries<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.approved_countries = normalize_code_set(values);
        self
    }

    /// Replaces the approved-state set; same normalization as countries.
    pub fn with_approved_states<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.approved_states = normalize_code_set(values);
        self
    }

    /// Replaces the approved-zip set; entries are trimmed, empty ones dropped.
    pub fn with_approved_zips<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.approved_zips = values
            .into_iter()
            .map(|z| z.as_ref().trim().to_string())
            .filter(|z| !z.is_empty())
            .collect();
        self
    }
}

/// Normalizes a list of country/state codes: trim, uppercase, drop empties,
/// deduplicate.
pub fn normalize_code_set<I, S>(values: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_ascii_uppercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Normalizes an IP list: trim, drop empties, deduplicate. Entries are kept
/// as strings because blacklist entries may be wildcard patterns.
pub fn normalize_ip_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}
