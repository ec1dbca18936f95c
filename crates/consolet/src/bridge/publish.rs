//! Atomic command publication.
//!
//! A command becomes visible to the host by writing it to a temporary
//! file inside the channel directory and renaming it onto the well-known
//! command path. The rename stays on one filesystem, so a concurrently
//! polling reader sees either the previous command (or nothing) or the
//! complete new one - never a truncated file.

use std::io::Write;
use std::path::PathBuf;

use crate::bridge::channel::ChannelDir;
use crate::bridge::protocol::CommandEnvelope;

/// Failure to get a command onto the channel.
///
/// All variants are fatal for the call in progress: the poll loop is
/// never entered and nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to stage command in {}: {source}", .dir.display())]
    Stage {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to publish command to {}: {source}", .path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Publish one envelope onto the channel's command path.
///
/// Any response file left behind by an earlier call is deleted first, so
/// the poller that follows can only ever match a reply written after this
/// command went out.
pub fn publish(channel: &ChannelDir, envelope: &CommandEnvelope) -> Result<(), PublishError> {
    if let Err(e) = channel.clear_stale_response() {
        // The id check in the poller still rejects a stale reply; losing
        // the early cleanup only delays its removal.
        tracing::warn!(
            path = %channel.response_path().display(),
            error = %e,
            "Could not remove stale response file"
        );
    }

    let bytes = serde_json::to_vec(envelope)?;

    let stage = |source| PublishError::Stage {
        dir: channel.dir().to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(channel.dir()).map_err(stage)?;
    tmp.write_all(&bytes).map_err(stage)?;

    tmp.persist(channel.command_path())
        .map_err(|e| PublishError::Replace {
            path: channel.command_path().to_path_buf(),
            source: e.error,
        })?;

    tracing::debug!(
        id = %envelope.id,
        action = %envelope.action,
        "Published command"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn envelope(action: &str) -> CommandEnvelope {
        let mut params = Map::new();
        params.insert("value".to_string(), json!(1));
        CommandEnvelope::new(action, params)
    }

    #[test]
    fn published_command_reads_back_byte_identical() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path());

        let cmd = envelope("ping");
        publish(&channel, &cmd).unwrap();

        let on_disk = fs::read(channel.command_path()).unwrap();
        assert_eq!(on_disk, serde_json::to_vec(&cmd).unwrap());
    }

    #[test]
    fn publish_deletes_preexisting_response() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path());
        fs::write(channel.response_path(), b"{\"stale\":true}").unwrap();

        publish(&channel, &envelope("ping")).unwrap();
        assert!(!channel.response_path().exists());
    }

    #[test]
    fn publish_overwrites_previous_command() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path());

        publish(&channel, &envelope("first")).unwrap();
        let second = envelope("second");
        publish(&channel, &second).unwrap();

        let on_disk: CommandEnvelope =
            serde_json::from_slice(&fs::read(channel.command_path()).unwrap()).unwrap();
        assert_eq!(on_disk.id, second.id);
        assert_eq!(on_disk.action, "second");
    }

    #[test]
    fn publish_into_missing_dir_fails_fast() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path().join("nope"));

        let err = publish(&channel, &envelope("ping")).unwrap_err();
        assert!(matches!(err, PublishError::Stage { .. }), "got {err:?}");
    }

    /// A reader polling the command path at full speed must only ever see
    /// complete envelopes, even while the writer replaces the file in a
    /// tight loop.
    #[test]
    fn concurrent_reader_never_sees_partial_write() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path());
        publish(&channel, &envelope("warmup")).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let reader = {
            let stop = Arc::clone(&stop);
            let path = channel.command_path().to_path_buf();
            std::thread::spawn(move || {
                let mut reads = 0u32;
                while !stop.load(Ordering::Relaxed) {
                    let bytes = fs::read(&path).expect("command file must always exist");
                    let cmd: CommandEnvelope =
                        serde_json::from_slice(&bytes).expect("command file must be complete JSON");
                    assert!(cmd.action.starts_with("cmd-") || cmd.action == "warmup");
                    reads += 1;
                }
                reads
            })
        };

        for i in 0..200 {
            publish(&channel, &envelope(&format!("cmd-{i}"))).unwrap();
        }
        stop.store(true, Ordering::Relaxed);

        let reads = reader.join().unwrap();
        assert!(reads > 0);
    }
}
