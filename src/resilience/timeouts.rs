//! Timeout enforcement.
//!
//! # Responsibilities
//! - Build the outbound HTTP client with a fixed per-call deadline
//! - Classify deadline expiry separately from other transport failures
//!
//! # Design Decisions
//! - The deadline is applied by reqwest to the whole call (connect + body)
//! - Dropping a response releases its connection, so every exit path frees it

use std::time::Duration;

use crate::config::TimeoutConfig;

/// Fixed deadline for every outbound call.
pub fn upstream_deadline(config: &TimeoutConfig) -> Duration {
    Duration::from_secs(config.upstream_secs)
}

/// HTTP client shared by all outbound calls of one process.
pub fn outbound_client(config: &TimeoutConfig) -> reqwest::Result<reqwest::Client> {
    let deadline = upstream_deadline(config);
    reqwest::Client::builder()
        .timeout(deadline)
        .connect_timeout(deadline)
        .user_agent(concat!("cep-weather/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// True when the error came from the deadline rather than the transport.
pub fn is_deadline(err: &reqwest::Error) -> bool {
    err.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_from_config() {
        let config = TimeoutConfig::default();
        assert_eq!(upstream_deadline(&config), Duration::from_secs(10));
        assert!(outbound_client(&config).is_ok());
    }

    #[tokio::test]
    async fn test_refused_connection_is_not_deadline() {
        let client = outbound_client(&TimeoutConfig { upstream_secs: 1 }).unwrap();
        // Port 9 (discard) is almost never listening on loopback.
        let err = client.get("http://127.0.0.1:9/").send().await.unwrap_err();
        assert!(!is_deadline(&err));
        assert!(err.is_connect());
    }
}
