//! Mailbox poll loop.
//!
//! One recurring task per signed-in identity drains its relay mailbox at
//! a fixed interval and feeds every discovered signal into the
//! controller. The poll task is the sole producer of inbound signals;
//! transport errors are logged and retried on the next tick, never
//! surfaced to the user.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When
//! the token is cancelled, the task completes its current iteration and
//! exits cleanly.

use crate::controller::CallController;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run the mailbox poll loop for a controller.
///
/// Exits when the cancellation token is triggered.
pub async fn run_mailbox_poll(controller: Arc<CallController>, cancel_token: CancellationToken) {
    let mut interval = tokio::time::interval(controller.config().poll_interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match controller.poll_once().await {
                    Ok(count) => {
                        if count > 0 {
                            debug!(
                                target: "call.tasks.poll",
                                identity = controller.identity(),
                                count,
                                "Processed inbound signals"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "call.tasks.poll",
                            identity = controller.identity(),
                            error = %e,
                            "Mailbox poll failed, retrying on next interval"
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "call.tasks.poll",
                    identity = controller.identity(),
                    "Poll task received shutdown signal, exiting"
                );
                break;
            }
        }
    }
}
