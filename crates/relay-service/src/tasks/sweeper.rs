//! Stale-signal sweeper background task.
//!
//! Signals describe a call attempt in flight; a recipient that has not
//! polled within the TTL is not going to complete that attempt, so the
//! sweeper periodically drops expired messages to keep mailboxes of
//! never-polling recipients from growing without bound.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When
//! the token is cancelled, the task completes its current iteration and
//! exits cleanly.

use crate::observability::metrics;
use crate::repositories::MailboxRepository;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the stale-signal sweeper loop.
///
/// Every `sweep_interval`, drops stored signals older than `signal_ttl`.
/// Surviving messages keep their relative order. Exits when the
/// cancellation token is triggered.
///
/// # Arguments
///
/// * `mailboxes` - Shared mailbox store
/// * `signal_ttl` - Age at which an undelivered signal expires
/// * `sweep_interval` - Time between sweeps
/// * `cancel_token` - Token for graceful shutdown
pub async fn run_signal_sweeper(
    mailboxes: Arc<MailboxRepository>,
    signal_ttl: Duration,
    sweep_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut interval = tokio::time::interval(sweep_interval);
    let ttl = chrono::Duration::from_std(signal_ttl).unwrap_or(chrono::Duration::MAX);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Saturating: an absurd TTL just means nothing expires.
                let cutoff = Utc::now()
                    .checked_sub_signed(ttl)
                    .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
                let swept = mailboxes.sweep_older_than(cutoff);
                if swept > 0 {
                    metrics::record_swept(swept);
                    metrics::update_mailbox_depth(mailboxes.total_depth());
                    warn!(
                        target: "relay.tasks.sweeper",
                        swept,
                        "Dropped expired signals"
                    );
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "relay.tasks.sweeper",
                    "Sweeper task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}
