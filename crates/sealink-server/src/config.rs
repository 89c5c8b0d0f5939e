// ============================================
// File: crates/sealink-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the SeaLink server,
//! loaded from a TOML file.
//!
//! ## Main Functionality
//! - `ServerConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//!
//! ## Configuration Sections
//! - `network`: TCP listen address
//! - `keys`: RSA modulus size for the server keypair
//! - `limits`: Concurrent session bound
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:7300"
//!
//! [keys]
//! rsa_bits = 3072
//!
//! [limits]
//! max_sessions = 1024
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require a listener restart
//! - Port 0 is accepted and means "pick an ephemeral port"
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use sealink_core::crypto::{DEFAULT_RSA_BITS, MIN_RSA_BITS};

use crate::error::{Result, ServerError};

/// Log levels accepted by `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Server keypair configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.keys.validate()?;
        self.limits.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Returns the listen address.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.network.listen_addr
    }

    /// Returns the concurrent session bound.
    #[must_use]
    pub fn max_sessions(&self) -> usize {
        self.limits.max_sessions
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 7300))
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

// ============================================
// KeysConfig
// ============================================

/// Server keypair configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// RSA modulus size in bits.
    #[serde(default = "default_rsa_bits")]
    pub rsa_bits: usize,
}

fn default_rsa_bits() -> usize {
    DEFAULT_RSA_BITS
}

impl KeysConfig {
    fn validate(&self) -> Result<()> {
        if self.rsa_bits < MIN_RSA_BITS {
            return Err(ServerError::config_invalid(
                "keys.rsa_bits",
                format!("must be at least {}", MIN_RSA_BITS),
            ));
        }
        if self.rsa_bits % 8 != 0 {
            return Err(ServerError::config_invalid(
                "keys.rsa_bits",
                "must be a multiple of 8",
            ));
        }
        Ok(())
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            rsa_bits: default_rsa_bits(),
        }
    }
}

// ============================================
// LimitsConfig
// ============================================

/// Resource limits configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    1024
}

impl LimitsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(ServerError::config_invalid(
                "limits.max_sessions",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(ServerError::config_invalid(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr().port(), 7300);
        assert_eq!(config.keys.rsa_bits, DEFAULT_RSA_BITS);
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [network]
            listen_addr = "127.0.0.1:9000"

            [keys]
            rsa_bits = 2048

            [limits]
            max_sessions = 16

            [logging]
            level = "debug"
        "#;

        let config = ServerConfig::from_str(toml).unwrap();
        assert_eq!(config.network.listen_addr.port(), 9000);
        assert_eq!(config.keys.rsa_bits, 2048);
        assert_eq!(config.max_sessions(), 16);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ServerConfig::from_str("[limits]\nmax_sessions = 3\n").unwrap();
        assert_eq!(config.max_sessions(), 3);
        assert_eq!(config.keys.rsa_bits, DEFAULT_RSA_BITS);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let small_key = ServerConfig::from_str("[keys]\nrsa_bits = 1024\n");
        assert!(matches!(small_key, Err(ServerError::ConfigInvalid { .. })));

        let no_sessions = ServerConfig::from_str("[limits]\nmax_sessions = 0\n");
        assert!(matches!(no_sessions, Err(ServerError::ConfigInvalid { .. })));

        let level = ServerConfig::from_str("[logging]\nlevel = \"loud\"\n");
        assert!(matches!(level, Err(ServerError::ConfigInvalid { .. })));

        let garbage = ServerConfig::from_str("[network\nlisten_addr = 1");
        assert!(matches!(garbage, Err(ServerError::ConfigLoad { .. })));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = ServerConfig::default();
        config.limits.max_sessions = 42;

        let parsed = ServerConfig::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed.max_sessions(), 42);
        assert_eq!(parsed.listen_addr(), config.listen_addr());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = ServerConfig::load("/nonexistent/sealink/server.toml").await;
        assert!(matches!(result, Err(ServerError::ConfigLoad { .. })));
    }
}
