//! Environment variable parsing utilities
//!
//! Shared by every service's `Config::from_env` so that optional settings
//! fall back to defaults without unwrap() calls.

use std::str::FromStr;

/// Parse an environment variable with a default fallback
///
/// # Example
/// ```ignore
/// let batch_size: usize = parse_env_with_default("KAFKA_BATCH_SIZE", 100);
/// ```
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an environment variable, returning Option (None if missing or invalid)
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse an environment variable, returning Result
///
/// # Example
/// ```ignore
/// let brokers = parse_env_required::<String>("KAFKA_BROKERS")?;
/// ```
pub fn parse_env_required<T: FromStr>(key: &str) -> Result<T, String> {
    std::env::var(key)
        .map_err(|_| format!("{} environment variable not set", key))?
        .parse()
        .map_err(|_| format!("Failed to parse environment variable {}", key))
}
