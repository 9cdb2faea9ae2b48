//! HTTP client initialization.

use std::sync::Arc;

use reqwest::Client;

use crate::config::{PROVIDER_TIMEOUT, PROVIDER_USER_AGENT};
use crate::error_handling::InitializationError;

/// Builds the shared HTTP client used for geolocation provider calls.
///
/// The client carries the provider timeout so no lookup can hang the
/// decision path beyond the configured bound.
pub fn init_client() -> Result<Arc<Client>, InitializationError> {
    let client = Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .user_agent(PROVIDER_USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}
