//! One-time setup flows: install, uninstall, and diagnostics.
//!
//! Installation provisions the channel directory and merges a launch
//! descriptor into the driving agent's JSON config so the agent knows how
//! to start the client. Both directions are conservative: install is
//! idempotent, uninstall removes exactly what install added.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::bridge::channel::ChannelDir;
use crate::client::{HostClient, Outcome};
use crate::jsonconfig;

pub const ENV_AGENT_CONFIG: &str = "CONSOLET_AGENT_CONFIG";

/// Where the launch descriptor lives inside the agent config file.
pub const SERVER_KEY_PATH: &[&str] = &["servers", "consolet"];

/// Timeout for the liveness probe in `check` - far shorter than a normal
/// call, a healthy listener answers a ping in milliseconds.
pub const CHECK_PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Launch descriptor merged into the driving agent's config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ConnectorSpec {
    /// Describe how to launch the currently running binary.
    pub fn current_exe() -> anyhow::Result<Self> {
        let exe = std::env::current_exe().context("cannot determine current executable path")?;
        Ok(Self {
            command: exe.display().to_string(),
            args: Vec::new(),
        })
    }
}

/// The agent config file targeted by install/uninstall.
///
/// `CONSOLET_AGENT_CONFIG` overrides; the default sits under the user
/// config directory.
pub fn agent_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_AGENT_CONFIG)
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|config| config.join("consolet").join("agents.json"))
        .unwrap_or_else(|| PathBuf::from("agents.json"))
}

/// Provision the channel directory and register the launch descriptor.
///
/// Returns `true` when the agent config was modified, `false` when it was
/// already up to date. Re-running is always safe.
pub fn install(
    channel: &ChannelDir,
    agent_config: &Path,
    spec: &ConnectorSpec,
) -> anyhow::Result<bool> {
    channel.ensure().with_context(|| {
        format!(
            "failed to create channel directory {}",
            channel.dir().display()
        )
    })?;

    let value = serde_json::to_value(spec).context("failed to encode connector descriptor")?;
    let changed = jsonconfig::merge_value(agent_config, SERVER_KEY_PATH, &value)
        .with_context(|| format!("failed to update agent config {}", agent_config.display()))?;

    tracing::info!(
        channel_dir = %channel.dir().display(),
        agent_config = %agent_config.display(),
        changed,
        "Install complete"
    );
    Ok(changed)
}

/// What `uninstall` actually removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UninstallReport {
    pub removed_config: bool,
    pub removed_channel_dir: bool,
}

/// Remove the launch descriptor and the channel directory.
pub fn uninstall(channel: &ChannelDir, agent_config: &Path) -> anyhow::Result<UninstallReport> {
    let removed_config = jsonconfig::remove_key(agent_config, SERVER_KEY_PATH)
        .with_context(|| format!("failed to update agent config {}", agent_config.display()))?;

    let removed_channel_dir = match fs::remove_dir_all(channel.dir()) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            return Err(e).with_context(|| {
                format!(
                    "failed to remove channel directory {}",
                    channel.dir().display()
                )
            });
        }
    };

    tracing::info!(removed_config, removed_channel_dir, "Uninstall complete");
    Ok(UninstallReport {
        removed_config,
        removed_channel_dir,
    })
}

/// Snapshot of the setup, for the `check` diagnostics command.
#[derive(Debug)]
pub struct CheckReport {
    pub channel_dir: PathBuf,
    pub channel_dir_exists: bool,
    pub agent_config: PathBuf,
    pub agent_configured: bool,
    /// Result of a short-timeout ping; a Failure here usually means the
    /// listener is not running inside the host application.
    pub host: Outcome,
}

impl CheckReport {
    pub fn all_ok(&self) -> bool {
        self.channel_dir_exists && self.agent_configured && self.host.is_success()
    }
}

/// Diagnose the setup: directory, agent config, and host liveness.
pub async fn check(client: &HostClient, agent_config: &Path) -> CheckReport {
    let channel = client.channel();
    let agent_configured = jsonconfig::read_value(agent_config, SERVER_KEY_PATH)
        .ok()
        .flatten()
        .is_some();

    CheckReport {
        channel_dir: channel.dir().to_path_buf(),
        channel_dir_exists: channel.dir().is_dir(),
        agent_config: agent_config.to_path_buf(),
        agent_configured,
        host: client.ping(CHECK_PING_TIMEOUT).await,
    }
}
