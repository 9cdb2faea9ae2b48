//! Geolocation provider client.
//!
//! Talks to an ipapi-compatible HTTP API. Every failure mode (network error,
//! timeout, non-2xx status, unparseable body, provider error envelope)
//! collapses to `None`: the decision pipeline treats "provider broken" the
//! same as "no data for this IP" and never sees an error.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::geo::types::GeoRecord;

/// A source of geolocation records.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Fetches the record for `ip`, or `None` when the provider cannot
    /// supply one for any reason.
    async fn lookup(&self, ip: IpAddr) -> Option<GeoRecord>;
}

/// HTTP provider using the ipapi request shape:
/// `GET <base_url>/<ip>?access_key=<key>`.
pub struct HttpGeoProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl HttpGeoProvider {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl GeoLookup for HttpGeoProvider {
    async fn lookup(&self, ip: IpAddr) -> Option<GeoRecord> {
        if self.api_key.is_empty() {
            log::debug!("Geolocation lookup skipped for {ip}: no API key configured");
            return None;
        }

        let url = format!("{}/{}", self.base_url, ip);
        let response = match self
            .client
            .get(&url)
            .query(&[("access_key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Geolocation request for {ip} failed: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            log::warn!(
                "Geolocation request for {ip} returned HTTP {}",
                response.status()
            );
            return None;
        }

        let body: Value = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Geolocation response for {ip} was not valid JSON: {e}");
                return None;
            }
        };

        let record = GeoRecord::from_provider_json(&body);
        if record.is_none() {
            log::warn!("Geolocation provider returned no usable data for {ip}: {body}");
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::init_client;

    #[tokio::test]
    async fn test_empty_api_key_short_circuits() {
        let provider = HttpGeoProvider::new(
            init_client().unwrap(),
            "http://127.0.0.1:1/api",
            "",
        );
        assert!(provider.lookup("8.8.8.8".parse().unwrap()).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_none() {
        // Port 1 on loopback refuses connections immediately.
        let provider = HttpGeoProvider::new(
            init_client().unwrap(),
            "http://127.0.0.1:1/api",
            "test-key",
        );
        assert!(provider.lookup("8.8.8.8".parse().unwrap()).await.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = HttpGeoProvider::new(
            init_client().unwrap(),
            "https://api.example.com/api/",
            "k",
        );
        assert_eq!(provider.base_url, "https://api.example.com/api");
    }
}
