//! Call controller configuration.

use std::time::Duration;

/// Default mailbox poll interval in milliseconds.
///
/// Delivery latency is bounded only by this interval, not by the
/// transport; one second keeps ringing feel responsive without hammering
/// the relay.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default bounded wait for an answer before a dial is recorded as
/// missed, in seconds.
pub const DEFAULT_DIAL_TIMEOUT_SECONDS: u64 = 30;

/// Controller tunables.
///
/// Both values are fixed constants at runtime, not computed; tests
/// shrink them to keep scenarios fast.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Fixed interval between mailbox polls.
    pub poll_interval: Duration,

    /// How long a dialing call waits for an answer before ending with
    /// outcome `missed`.
    pub dial_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            dial_timeout: Duration::from_secs(DEFAULT_DIAL_TIMEOUT_SECONDS),
        }
    }
}
