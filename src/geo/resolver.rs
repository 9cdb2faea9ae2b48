//! Geolocation resolution: private-range short-circuit, then cache, then
//! provider.
//!
//! Private and reserved addresses are never sent to the provider and never
//! cached; they simply have no location. Public addresses hit the cache
//! first, and a provider fetch populates it so each IP costs at most one
//! provider call per TTL.

use std::net::IpAddr;
use std::sync::Arc;

use crate::geo::cache::GeoCache;
use crate::geo::provider::GeoLookup;
use crate::geo::types::GeoRecord;
use crate::ip::is_private_or_reserved;

/// Combines the cache and the provider behind one lookup call.
pub struct GeoResolver {
    cache: Arc<dyn GeoCache>,
    provider: Arc<dyn GeoLookup>,
}

impl GeoResolver {
    pub fn new(cache: Arc<dyn GeoCache>, provider: Arc<dyn GeoLookup>) -> Self {
        Self { cache, provider }
    }

    /// Resolves the location of `ip`.
    ///
    /// Returns `None` for private/reserved addresses without touching cache
    /// or provider. Otherwise serves from cache when fresh, falling back to
    /// the provider and caching a successful fetch. Provider misses are not
    /// negatively cached, so a recovering provider is retried on the next
    /// request.
    pub async fn resolve(&self, ip: IpAddr) -> Option<GeoRecord> {
        if is_private_or_reserved(ip) {
            log::debug!("Skipping geolocation for private/reserved address {ip}");
            return None;
        }

        if let Some(record) = self.cache.get(ip) {
            log::debug!("Geolocation cache hit for {ip}: {}", record.country_code);
            return Some(record);
        }

        let record = self.provider.lookup(ip).await?;
        self.cache.put(ip, record.clone());
        Some(record)
    }

    /// Resolves `ip` bypassing any cached entry; a successful fetch replaces
    /// the cache entry.
    pub async fn resolve_fresh(&self, ip: IpAddr) -> Option<GeoRecord> {
        if is_private_or_reserved(ip) {
            return None;
        }
        let record = self.provider.lookup(ip).await?;
        self.cache.put(ip, record.clone());
        Some(record)
    }
}
