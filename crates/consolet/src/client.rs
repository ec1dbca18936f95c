//! Client façade: single-flight call/response over the file channel.
//!
//! [`HostClient`] is the one entry point the dispatch layer above uses.
//! A call publishes a command, waits for the matching reply, and folds
//! every failure mode - publish error, timeout, shutdown, host-reported
//! error - into an [`Outcome`]. Nothing here panics or retries.
//!
//! The channel is one shared file pair, so only one command may be in
//! flight at a time. The façade enforces that with a mutex held across
//! publish and poll; concurrent callers queue rather than clobber each
//! other's command file.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::bridge::channel::ChannelDir;
use crate::bridge::poll::{self, AwaitError};
use crate::bridge::protocol::{CommandEnvelope, ResponseEnvelope};
use crate::bridge::publish;
use crate::config::ChannelConfig;

/// Terminal outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { result: Value },
    Failure { error: String },
}

impl Outcome {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    fn from_response(resp: ResponseEnvelope) -> Self {
        if resp.success {
            Self::Success {
                result: resp.result.unwrap_or(Value::Null),
            }
        } else {
            Self::Failure {
                error: resp
                    .error
                    .unwrap_or_else(|| "host reported failure without detail".to_string()),
            }
        }
    }
}

/// The boundary the tool dispatch layer codes against.
///
/// Implementations execute one named action on the host and report the
/// terminal outcome; they never surface partial results.
#[async_trait::async_trait]
pub trait ConsoleBridge: Send + Sync {
    async fn call(&self, action: &str, params: Map<String, Value>) -> Outcome;
}

/// IPC client bound to one channel directory.
pub struct HostClient {
    config: ChannelConfig,
    channel: ChannelDir,
    flight: Mutex<()>,
    cancel: CancellationToken,
}

impl HostClient {
    pub fn new(config: ChannelConfig) -> Self {
        let channel = ChannelDir::new(config.dir.clone());
        Self {
            config,
            channel,
            flight: Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ChannelConfig::from_env())
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn channel(&self) -> &ChannelDir {
        &self.channel
    }

    /// Make in-flight and future calls return promptly with a Failure.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Short-timeout liveness probe used by diagnostics.
    pub async fn ping(&self, timeout: Duration) -> Outcome {
        self.call_with_timeout("ping", Map::new(), timeout).await
    }

    async fn call_with_timeout(
        &self,
        action: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Outcome {
        // Single-flight: held across publish and poll so a second caller
        // cannot overwrite the command file before its reply is collected.
        let _flight = self.flight.lock().await;

        if let Err(e) = self.channel.ensure() {
            return Outcome::failure(format!(
                "failed to prepare channel directory {}: {e}",
                self.channel.dir().display()
            ));
        }

        let envelope = CommandEnvelope::new(action, params);
        let id = envelope.id;
        tracing::debug!(%id, action, "Dispatching command");

        if let Err(e) = publish::publish(&self.channel, &envelope) {
            return Outcome::failure(e.to_string());
        }

        match poll::await_response(
            &self.channel,
            id,
            self.config.poll_interval,
            timeout,
            &self.cancel,
        )
        .await
        {
            Ok(resp) => Outcome::from_response(resp),
            Err(e @ AwaitError::TimedOut { .. }) => {
                tracing::warn!(%id, action, "Command timed out");
                Outcome::failure(e.to_string())
            }
            Err(e @ AwaitError::Cancelled) => Outcome::failure(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl ConsoleBridge for HostClient {
    async fn call(&self, action: &str, params: Map<String, Value>) -> Outcome {
        self.call_with_timeout(action, params, self.config.timeout)
            .await
    }
}
