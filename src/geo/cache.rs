//! TTL cache for geolocation records.
//!
//! Bounds provider traffic to at most one lookup per IP per TTL. Expiry is
//! lazy: stale entries are dropped on the read that finds them, there is no
//! background sweeper.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use crate::config::GEO_CACHE_TTL;
use crate::geo::types::GeoRecord;

/// Read-through cache interface for geolocation records.
pub trait GeoCache: Send + Sync {
    /// Returns the cached record for `ip` if present and fresh. A stale hit
    /// is removed and reported as a miss.
    fn get(&self, ip: IpAddr) -> Option<GeoRecord>;

    /// Stores a record for `ip`, replacing any previous entry.
    fn put(&self, ip: IpAddr, record: GeoRecord);

    /// Drops every entry.
    fn clear(&self);
}

/// In-process cache keyed by IP with a fixed TTL.
pub struct InMemoryGeoCache {
    ttl: Duration,
    entries: Mutex<HashMap<IpAddr, GeoRecord>>,
}

impl InMemoryGeoCache {
    /// Creates a cache with the default 1-hour TTL.
    pub fn new() -> Self {
        Self::with_ttl(GEO_CACHE_TTL)
    }

    /// Creates a cache with an explicit TTL. Used by tests to exercise
    /// expiry without waiting.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryGeoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoCache for InMemoryGeoCache {
    fn get(&self, ip: IpAddr) -> Option<GeoRecord> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = entries
            .get(&ip)
            .map(|r| r.is_fresh(Utc::now(), self.ttl))
            .unwrap_or(false);
        if fresh {
            entries.get(&ip).cloned()
        } else {
            entries.remove(&ip);
            None
        }
    }

    fn put(&self, ip: IpAddr, record: GeoRecord) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(ip, record);
    }

    fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}
