//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while validating wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message failed structural validation and was never stored.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}
