//! Geolocation: canonical records, TTL cache, provider client, and the
//! resolver that composes them.

mod cache;
mod provider;
mod resolver;
mod types;

pub use cache::{GeoCache, InMemoryGeoCache};
pub use provider::{GeoLookup, HttpGeoProvider};
pub use resolver::GeoResolver;
pub use types::GeoRecord;
