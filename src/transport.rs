//! Named-pipe channels.
//!
//! The server owns one public FIFO that any number of clients write
//! requests into. Each client owns a private FIFO the server writes its
//! reply into. Opening a FIFO for writing blocks until a reader shows up,
//! which is the rendezvous both sides rely on.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use nix::sys::stat::Mode;
use tokio::net::unix::pipe;

use crate::error::{HashqError, Result};

/// Create a FIFO at `path`, replacing whatever stale file is there.
pub fn create_channel(path: &Path) -> Result<()> {
    remove_channel(path).map_err(|source| HashqError::ChannelCreation {
        path: path.to_path_buf(),
        source,
    })?;
    nix::unistd::mkfifo(path, Mode::from_bits_truncate(0o666)).map_err(|errno| {
        HashqError::ChannelCreation {
            path: path.to_path_buf(),
            source: errno.into(),
        }
    })?;
    tracing::debug!(path = %path.display(), "Created channel");
    Ok(())
}

/// Remove a channel. Missing files are not an error.
pub fn remove_channel(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed channel");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Open the public channel for reading.
///
/// The server also holds the write side open, so the stream never reaches
/// end-of-file when the last client disconnects.
pub fn open_inbound(path: &Path) -> std::io::Result<pipe::Receiver> {
    pipe::OpenOptions::new().read_write(true).open_receiver(path)
}

/// Open the public channel as a client. Fails fast when no server is
/// reading it.
pub fn connect(path: &Path) -> Result<pipe::Sender> {
    pipe::OpenOptions::new().open_sender(path).map_err(|e| {
        match e.raw_os_error() {
            // ENXIO: FIFO exists but nobody reads it.
            Some(code) if code == nix::libc::ENXIO => {
                HashqError::TransportUnavailable(path.to_path_buf())
            }
            _ if e.kind() == std::io::ErrorKind::NotFound => {
                HashqError::TransportUnavailable(path.to_path_buf())
            }
            _ => HashqError::Io(e),
        }
    })
}

/// Opens reply channels for the workers and the dispatcher.
pub trait ReplyChannels: Send + Sync {
    /// Open `channel` for writing. May block until the client is reading.
    fn open(&self, channel: &Path) -> std::io::Result<Box<dyn Write + Send>>;
}

/// Reply channels backed by client-created FIFOs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoReplies;

impl ReplyChannels for FifoReplies {
    fn open(&self, channel: &Path) -> std::io::Result<Box<dyn Write + Send>> {
        // No `create`: a vanished client must fail here, not leave a
        // regular file behind.
        let file = OpenOptions::new().write(true).open(channel)?;
        Ok(Box::new(file))
    }
}

/// A client's private reply FIFO, removed when dropped.
#[derive(Debug)]
pub struct PrivateChannel {
    path: PathBuf,
}

impl PrivateChannel {
    /// Create `hashq_client_<pid>_<n>.fifo` under `dir`.
    pub fn create(dir: &Path) -> Result<Self> {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("hashq_client_{}_{}.fifo", std::process::id(), n));
        create_channel(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PrivateChannel {
    fn drop(&mut self) {
        if let Err(e) = remove_channel(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove reply channel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::FileTypeExt;
    use tempfile::tempdir;

    #[test]
    fn create_replaces_stale_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.fifo");
        std::fs::write(&path, b"stale").unwrap();

        create_channel(&path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.file_type().is_fifo());
    }

    #[test]
    fn create_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no/such/dir/server.fifo");
        assert!(matches!(
            create_channel(&path),
            Err(HashqError::ChannelCreation { .. })
        ));
    }

    #[test]
    fn remove_missing_channel_is_ok() {
        let dir = tempdir().unwrap();
        assert!(remove_channel(&dir.path().join("gone")).is_ok());
    }

    #[test]
    fn private_channel_is_removed_on_drop() {
        let dir = tempdir().unwrap();
        let path = {
            let channel = PrivateChannel::create(dir.path()).unwrap();
            assert!(channel.path().exists());
            channel.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn opening_vanished_reply_channel_fails() {
        let dir = tempdir().unwrap();
        let err = FifoReplies.open(&dir.path().join("client.fifo")).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(!dir.path().join("client.fifo").exists());
    }

    #[tokio::test]
    async fn connect_without_reader_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("server.fifo");

        assert!(matches!(
            connect(&path),
            Err(HashqError::TransportUnavailable(_))
        ));

        create_channel(&path).unwrap();
        assert!(matches!(
            connect(&path),
            Err(HashqError::TransportUnavailable(_))
        ));

        let _inbound = open_inbound(&path).unwrap();
        assert!(connect(&path).is_ok());
    }
}
