//! Configuration constants.
//!
//! Defaults and fixed operational parameters: cache TTL, provider timeout,
//! rate-limit window, and the fallback block message.

use std::time::Duration;

/// Geolocation cache TTL (1 hour).
///
/// Cached records older than this are considered stale and dropped lazily on
/// the next read; there is no background sweep.
pub const GEO_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Timeout for a single geolocation provider request.
///
/// Provider unreachability must degrade to "no data", never hang the caller,
/// so every provider call is bounded by this.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Default geolocation provider base URL (ipapi-compatible API).
pub const DEFAULT_API_BASE_URL: &str = "https://api.ipapi.com/api";

/// Environment variable holding the geolocation provider API key.
pub const API_KEY_ENV: &str = "GEO_GATE_API_KEY";

/// Default rate-limit window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 3600;

/// Default maximum requests per IP within the rate-limit window.
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 3;

/// Default message shown in place of a blocked form.
pub const DEFAULT_BLOCKED_MESSAGE: &str =
    "We apologize, but we are currently not accepting submissions from your location.";

/// Default audit log database path (SQLite file).
pub const DB_PATH: &str = "./geo_gate.db";

/// User-Agent sent on provider requests.
pub const PROVIDER_USER_AGENT: &str = concat!("geo_gate/", env!("CARGO_PKG_VERSION"));

/// Zip comparisons use the first five characters only.
pub const ZIP_PREFIX_LEN: usize = 5;
