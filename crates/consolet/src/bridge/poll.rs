//! Response polling with deadline, correlation, and cancellation.
//!
//! The host signals completion by atomically placing `response.json` in
//! the channel directory. The poller consumes that file (read, then
//! delete) each cycle and only returns a reply whose id matches the
//! outstanding command. Everything else - malformed content, a reply to
//! some earlier abandoned command - is discarded and polling continues
//! until the deadline.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::bridge::channel::ChannelDir;
use crate::bridge::protocol::{CommandId, ResponseEnvelope};

/// Why no matching response was returned.
#[derive(Debug, thiserror::Error)]
pub enum AwaitError {
    /// Deadline passed without a matching reply. The command may still be
    /// executing host-side; the channel cannot tell "listener never
    /// started" from "listener still working".
    #[error(
        "host did not respond within {}ms - the console listener may not be running inside the host application",
        .timeout.as_millis()
    )]
    TimedOut { timeout: Duration },

    /// The owning client is shutting down.
    #[error("cancelled while waiting for host response")]
    Cancelled,
}

/// Wait for the reply to `expected_id`, consuming the response file.
///
/// The deadline is measured on [`tokio::time::Instant`], which is
/// monotonic - wall-clock adjustments cannot shorten or extend the wait.
pub async fn await_response(
    channel: &ChannelDir,
    expected_id: CommandId,
    poll_interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ResponseEnvelope, AwaitError> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(resp) = take_response(channel).await {
            if resp.id == expected_id {
                tracing::debug!(id = %resp.id, success = resp.success, "Matched host response");
                return Ok(resp);
            }
            tracing::debug!(
                got = %resp.id,
                expected = %expected_id,
                "Discarding response for a different command"
            );
        }

        if Instant::now() >= deadline {
            return Err(AwaitError::TimedOut { timeout });
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(AwaitError::Cancelled),
            _ = sleep(poll_interval) => {}
        }
    }
}

/// Consume whatever is at the response path, if anything parses.
///
/// The file is deleted as soon as it has been read; only one poller is
/// ever active per outstanding command, so read-then-delete cannot race
/// with another consumer. Unreadable or malformed content is treated as
/// transient and dropped.
async fn take_response(channel: &ChannelDir) -> Option<ResponseEnvelope> {
    let path = channel.response_path();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not read response file");
            return None;
        }
    };

    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::debug!(path = %path.display(), error = %e, "Could not remove response file");
    }

    match serde_json::from_slice(&bytes) {
        Ok(resp) => Some(resp),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Ignoring malformed response file");
            None
        }
    }
}
