//! Wire contract for the Parley signaling relay.
//!
//! Shared by the relay service and the call controller so both sides
//! serialize the exact same JSON for `/signal` and `/calls`.

#![warn(clippy::pedantic)]

pub mod error;
pub mod history;
pub mod signal;

pub use error::ProtocolError;
pub use history::{CallHistoryList, CallHistoryRecord, RecordCallRequest};
pub use signal::{SendSignalAck, SendSignalRequest, SignalBatch, SignalKind, SignalMessage};
