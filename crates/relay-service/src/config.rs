//! Relay service configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults. Numeric fields are validated at load time so a bad
//! deployment fails fast instead of sweeping with a zero interval.

use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default time-to-live for undelivered signals, in seconds.
///
/// Signaling messages are only useful within the dial window; a
/// recipient that has not polled for this long is not going to complete
/// the call they describe.
pub const DEFAULT_SIGNAL_TTL_SECONDS: u64 = 120;

/// Default sweep interval for the stale-signal sweeper, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 30;

/// Default relay instance ID prefix.
pub const DEFAULT_RELAY_ID_PREFIX: &str = "relay";

/// Relay service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Seconds an undelivered signal survives before the sweeper drops it.
    pub signal_ttl_seconds: u64,

    /// Seconds between stale-signal sweeps.
    pub sweep_interval_seconds: u64,

    /// Unique identifier for this relay instance, used in logs.
    pub relay_id: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("signal_ttl_seconds", &self.signal_ttl_seconds)
            .field("sweep_interval_seconds", &self.sweep_interval_seconds)
            .field("relay_id", &self.relay_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid signal TTL configuration: {0}")]
    InvalidSignalTtl(String),

    #[error("Invalid sweep interval configuration: {0}")]
    InvalidSweepInterval(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let signal_ttl_seconds = if let Some(value_str) = vars.get("SIGNAL_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidSignalTtl(format!(
                    "SIGNAL_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidSignalTtl(
                    "SIGNAL_TTL_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_SIGNAL_TTL_SECONDS
        };

        let sweep_interval_seconds = if let Some(value_str) = vars.get("SWEEP_INTERVAL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidSweepInterval(format!(
                    "SWEEP_INTERVAL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidSweepInterval(
                    "SWEEP_INTERVAL_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_SWEEP_INTERVAL_SECONDS
        };

        let relay_id = vars.get("RELAY_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{}-{}-{}", DEFAULT_RELAY_ID_PREFIX, hostname, short_suffix)
        });

        Ok(Config {
            bind_address,
            signal_ttl_seconds,
            sweep_interval_seconds,
            relay_id,
        })
    }
}
