//! Electrum connection settings

use serde::{Deserialize, Serialize};

/// Builder-style Electrum configuration
///
/// Defaults: 5 retries, no timeout, a stop gap and batch size of 10.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectrumConfig {
    /// `tcp://host:port` or `ssl://host:port`
    pub url: String,
    pub socks5: Option<String>,
    pub retry: u8,
    /// Seconds; `None` waits forever
    pub timeout: Option<u8>,
    /// Consecutive unused addresses before a full scan stops
    pub stop_gap: u64,
    pub batch_size: u64,
}

impl Default for ElectrumConfig {
    fn default() -> Self {
        Self {
            url: "ssl://electrum.blockstream.info:60002".to_string(),
            socks5: None,
            retry: 5,
            timeout: None,
            stop_gap: 10,
            batch_size: 10,
        }
    }
}

impl ElectrumConfig {
    /// Create a config for `url` with default settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Route through a SOCKS5 proxy
    pub fn socks5(mut self, proxy: impl Into<String>) -> Self {
        self.socks5 = Some(proxy.into());
        self
    }

    /// Set the number of connection retries
    pub fn retry(mut self, retry: u8) -> Self {
        self.retry = retry;
        self
    }

    /// Set the socket timeout in seconds
    pub fn timeout(mut self, seconds: u8) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Set the stop gap; clamped to at least 1
    pub fn stop_gap(mut self, stop_gap: u64) -> Self {
        self.stop_gap = stop_gap.max(1);
        self
    }

    /// Set the request batch size; clamped to at least 1
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ElectrumConfig::new("tcp://127.0.0.1:50001");
        assert_eq!(config.retry, 5);
        assert_eq!(config.timeout, None);
        assert_eq!(config.stop_gap, 10);
        assert_eq!(config.batch_size, 10);
        assert!(config.socks5.is_none());
    }

    #[test]
    fn test_builder_clamps_zero() {
        let config = ElectrumConfig::default().stop_gap(0).batch_size(0).timeout(3);
        assert_eq!(config.stop_gap, 1);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.timeout, Some(3));
    }

    #[test]
    fn test_partial_json() {
        let config: ElectrumConfig =
            serde_json::from_str(r#"{"url": "tcp://localhost:60401", "retry": 0}"#).unwrap();
        assert_eq!(config.url, "tcp://localhost:60401");
        assert_eq!(config.retry, 0);
        assert_eq!(config.stop_gap, 10);
    }
}
