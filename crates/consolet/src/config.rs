//! Runtime configuration for the file channel.
//!
//! Built once at process start - from the environment or from explicit
//! values - and handed into the client by value. Nothing on the
//! publish/poll path reads the environment.

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_IPC_DIR: &str = "CONSOLET_IPC_DIR";
pub const ENV_POLL_INTERVAL_MS: &str = "CONSOLET_POLL_INTERVAL_MS";
pub const ENV_TIMEOUT_MS: &str = "CONSOLET_TIMEOUT_MS";

/// Poll wake-up cadence: latency vs wake-up overhead.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Worst-case caller latency; generous because host-side execution may
/// involve UI work inside the host application.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_DIR_NAME: &str = ".consolet";

/// Channel tuning and location.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Rendezvous directory holding the command/response file pair.
    pub dir: PathBuf,
    /// Sleep between response-file checks.
    pub poll_interval: Duration,
    /// Wall-clock bound on one call, measured on a monotonic clock.
    pub timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// `~/.consolet`, falling back to a relative path when the home directory
/// cannot be resolved.
pub fn default_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR_NAME))
}

impl ChannelConfig {
    /// Read overrides from the environment, once, at startup.
    ///
    /// Unparsable duration values are warned about and ignored in favor
    /// of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(ENV_IPC_DIR)
            && !dir.is_empty()
        {
            config.dir = PathBuf::from(dir);
        }
        if let Some(interval) = duration_from_env(ENV_POLL_INTERVAL_MS) {
            config.poll_interval = interval;
        }
        if let Some(timeout) = duration_from_env(ENV_TIMEOUT_MS) {
            config.timeout = timeout;
        }

        config
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn duration_from_env(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<u64>() {
        Ok(millis) => Some(Duration::from_millis(millis)),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable duration override");
            None
        }
    }
}
