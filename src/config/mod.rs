//! Policy configuration and constants.
//!
//! This module provides:
//! - Configuration constants (TTLs, timeouts, defaults)
//! - The immutable [`PolicyConfig`] snapshot consumed per decision
//! - Lenient JSON policy-file loading

mod constants;
mod loader;
mod types;

pub use constants::*;
pub use loader::load_policy_file;
pub use types::{normalize_code_set, normalize_ip_list, LogFormat, LogLevel, PolicyConfig, RateLimitConfig};
