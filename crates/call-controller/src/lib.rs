//! Call Session Controller Library
//!
//! Client-side core of Parley's calling feature. One `CallController`
//! per signed-in identity owns the call lifecycle:
//!
//! - placing calls: acquire local media, create an offer, post it to the
//!   callee's relay mailbox
//! - receiving calls: surface discovered offers to the UI, answer on
//!   accept
//! - candidate exchange, concurrent with the offer/answer handshake
//! - teardown: idempotent hangup, synchronous track release, best-effort
//!   history recording
//!
//! The relay is reached through the `SignalTransport` seam so the
//! polling HTTP binding can be swapped for a push binding without
//! touching the state machine. Local capture and the peer transport are
//! reached through the `MediaBackend`/`MediaSession` seams; the
//! controller never talks to devices directly.
//!
//! # Modules
//!
//! - `actor` - Per-call task owning the media session
//! - `config` - Controller tunables (poll interval, dial timeout)
//! - `controller` - Public API, signal routing, glare resolution
//! - `errors` - Error types
//! - `history` - Best-effort call history sink
//! - `media` - Media capture/session seams and local track state
//! - `payload` - Client payload envelope for offers and answers
//! - `session` - Call session data and state machine
//! - `tasks` - Mailbox poll loop
//! - `transport` - Send/Poll/Clear seam and HTTP binding

#![warn(clippy::pedantic)]

pub mod actor;
pub mod config;
pub mod controller;
pub mod errors;
pub mod history;
pub mod media;
pub mod payload;
pub mod session;
pub mod tasks;
pub mod transport;

pub use actor::CallHandle;
pub use config::ControllerConfig;
pub use controller::{glare_winner, CallController, CallEvent};
pub use errors::CallError;
pub use history::{CallHistorySink, HistoryError, HttpCallHistorySink, MockCallHistorySink};
pub use media::{
    ConnectivityState, LocalTracks, MediaBackend, MediaError, MediaEvent, MediaSession,
    MockMediaBackend, MockMediaSession,
};
pub use session::{CallSession, CallState};
pub use transport::{HttpSignalTransport, MockSignalTransport, SignalTransport, TransportError};
