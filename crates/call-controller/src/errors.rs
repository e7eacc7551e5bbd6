//! Call controller error types.

use crate::media::MediaError;
use crate::transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the call controller's public operations.
#[derive(Debug, Error)]
pub enum CallError {
    /// Local camera/microphone could not be acquired. Surfaced to the
    /// user; the session never leaves idle and no signal is sent.
    #[error("Media unavailable: {0}")]
    MediaUnavailable(String),

    /// The local media session failed while negotiating.
    #[error("Media session error: {0}")]
    Media(String),

    /// A call is already active for this identity; a client must not
    /// hold two concurrently live captures.
    #[error("Another call is already in progress")]
    CallInProgress,

    /// The referenced call is not tracked by this controller.
    #[error("No such call")]
    UnknownCall,

    /// The referenced call has already reached a terminal state.
    #[error("Call already ended")]
    CallEnded,

    /// An inbound signal payload did not match the expected envelope.
    #[error("Invalid signal payload: {0}")]
    InvalidSignal(String),

    /// The relay could not be reached or rejected the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer identity is not usable as a mailbox key.
    #[error("Invalid peer identity")]
    InvalidPeer,
}

impl From<MediaError> for CallError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Unavailable(reason) => CallError::MediaUnavailable(reason),
            MediaError::Session(reason) => CallError::Media(reason),
        }
    }
}

impl From<TransportError> for CallError {
    fn from(err: TransportError) -> Self {
        CallError::Transport(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_media_unavailable_maps_from_media_error() {
        let error: CallError = MediaError::Unavailable("permission denied".to_string()).into();
        assert!(matches!(error, CallError::MediaUnavailable(reason) if reason == "permission denied"));
    }

    #[test]
    fn test_session_error_maps_to_media() {
        let error: CallError = MediaError::Session("sdp parse".to_string()).into();
        assert!(matches!(error, CallError::Media(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", CallError::CallInProgress),
            "Another call is already in progress"
        );
        assert_eq!(format!("{}", CallError::UnknownCall), "No such call");
    }
}
