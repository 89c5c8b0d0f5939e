// ============================================
// File: crates/sealink-client/src/config.rs
// ============================================
//! # Client Configuration
//!
//! ## Creation Reason
//! Describes where a `ClientConnection` connects and how it protects and
//! paces its exchanges. Loadable from TOML or built in code.
//!
//! ## Example Configuration
//! ```toml
//! host = "127.0.0.1"
//! port = 7300
//! secure = true
//! timeout_ms = 5000
//! request_timeout_secs = 30
//! enable_ping = false
//! key_bits = 3072
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use sealink_core::crypto::{DEFAULT_RSA_BITS, MIN_RSA_BITS};

use crate::error::{ClientError, Result};

/// Connection settings for one `ClientConnection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server host name or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Run the RSA handshake and encrypt bodies with the session key.
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// Dial timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for one `send` round trip, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Run the 1-second liveness prober.
    #[serde(default)]
    pub enable_ping: bool,

    /// RSA modulus size for the client keypair.
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7300
}

fn default_secure() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_key_bits() -> usize {
    DEFAULT_RSA_BITS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: default_secure(),
            timeout_ms: default_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            enable_ping: false,
            key_bits: default_key_bits(),
        }
    }
}

impl ClientConfig {
    /// Creates a config for `host:port` with every other field defaulted.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClientError::config(format!("{}: {}", path.display(), e)))?;

        Self::from_str(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ClientError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::config("host cannot be empty"));
        }
        if self.port == 0 {
            return Err(ClientError::config("port must be non-zero"));
        }
        if self.timeout_ms == 0 {
            return Err(ClientError::config("timeout_ms must be greater than 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::config(
                "request_timeout_secs must be greater than 0",
            ));
        }
        if self.key_bits < MIN_RSA_BITS || self.key_bits % 8 != 0 {
            return Err(ClientError::config(format!(
                "key_bits must be a multiple of 8 and at least {}",
                MIN_RSA_BITS
            )));
        }
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// `host:port` in a form accepted by `TcpStream::connect`.
    #[must_use]
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Dial timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Per-call `send` deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.secure);
        assert!(!config.enable_ping);
        assert_eq!(config.addr(), "127.0.0.1:7300");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml() {
        let config = ClientConfig::from_str("host = \"example.org\"\nsecure = false\n").unwrap();
        assert_eq!(config.host, "example.org");
        assert!(!config.secure);
        assert_eq!(config.port, 7300);
        assert_eq!(config.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_ipv6_addr() {
        assert_eq!(ClientConfig::new("::1", 9000).addr(), "[::1]:9000");
        assert_eq!(ClientConfig::new("[::1]", 9000).addr(), "[::1]:9000");
    }

    #[test]
    fn test_invalid_values_rejected() {
        for toml in [
            "host = \"\"",
            "port = 0",
            "timeout_ms = 0",
            "request_timeout_secs = 0",
            "key_bits = 1024",
            "key_bits = 2049",
        ] {
            assert!(
                matches!(ClientConfig::from_str(toml), Err(ClientError::Config { .. })),
                "accepted {}",
                toml
            );
        }
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = ClientConfig::new("10.0.0.2", 7400);
        config.enable_ping = true;
        assert_eq!(ClientConfig::from_str(&config.to_toml()).unwrap(), config);
    }
}
