//! HTTP request handlers for the relay service.

pub mod calls;
pub mod health;
pub mod metrics;
pub mod signal;

pub use calls::{list_calls, record_call};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use signal::{clear_signals, poll_signals, send_signal};
