//! Channel directory management.
//!
//! The channel directory is the rendezvous point between client and host:
//! `command.json` flows client → host, `response.json` flows host →
//! client. The directory path is predictable (derived from the
//! environment or a fixed default), so it is restricted to the owning
//! user where the platform supports it - payloads may carry session data.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const COMMAND_FILE: &str = "command.json";
pub const RESPONSE_FILE: &str = "response.json";

/// Well-known paths inside one channel directory.
#[derive(Debug, Clone)]
pub struct ChannelDir {
    dir: PathBuf,
    command_path: PathBuf,
    response_path: PathBuf,
}

impl ChannelDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let command_path = dir.join(COMMAND_FILE);
        let response_path = dir.join(RESPONSE_FILE);
        Self {
            dir,
            command_path,
            response_path,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn command_path(&self) -> &Path {
        &self.command_path
    }

    pub fn response_path(&self) -> &Path {
        &self.response_path
    }

    /// Create the directory (and parents) if absent, idempotently.
    ///
    /// On unix the directory is chmodded to owner-only. Failing to set
    /// permissions is tolerated: the channel still works, it is just not
    /// shielded from other local users.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if let Err(e) = fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700)) {
                tracing::debug!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Could not restrict channel directory permissions"
                );
            }
        }

        Ok(())
    }

    /// Delete a leftover response file, tolerating its absence.
    ///
    /// Called before every publish so a reply abandoned by a previous call
    /// can never be mistaken for the answer to the next command.
    pub fn clear_stale_response(&self) -> io::Result<()> {
        match fs::remove_file(&self.response_path) {
            Ok(()) => {
                tracing::debug!(
                    path = %self.response_path.display(),
                    "Removed stale response file"
                );
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_dir() {
        let channel = ChannelDir::new("/tmp/chan");
        assert_eq!(channel.dir(), Path::new("/tmp/chan"));
        assert_eq!(channel.command_path(), Path::new("/tmp/chan/command.json"));
        assert_eq!(channel.response_path(), Path::new("/tmp/chan/response.json"));
    }

    #[test]
    fn ensure_creates_nested_dirs_and_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path().join("a").join("b"));

        channel.ensure().unwrap();
        assert!(channel.dir().is_dir());

        // Second call is a no-op, not an error.
        channel.ensure().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn ensure_restricts_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path().join("chan"));
        channel.ensure().unwrap();

        let mode = fs::metadata(channel.dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn clear_stale_response_tolerates_absence() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path());

        channel.clear_stale_response().unwrap();
    }

    #[test]
    fn clear_stale_response_removes_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let channel = ChannelDir::new(tmp.path());
        fs::write(channel.response_path(), b"{}").unwrap();

        channel.clear_stale_response().unwrap();
        assert!(!channel.response_path().exists());
    }
}
