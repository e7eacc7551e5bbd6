//! Observability helpers for the relay service.

pub mod metrics;
