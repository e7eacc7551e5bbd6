//! Test utilities for Parley integration tests.

pub mod server_harness;

pub use server_harness::TestRelayServer;
