//! Client side of the protocol: send one request, wait for one reply.

use std::io::Read;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::config::{DEFAULT_CHANNEL_PATH, DEFAULT_REPLY_DIR};
use crate::error::{HashqError, Result};
use crate::protocol::{Request, Response, RESPONSE_LEN};
use crate::transport::{self, PrivateChannel};

#[derive(Debug, Clone)]
pub struct Client {
    server_channel: PathBuf,
    reply_dir: PathBuf,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_PATH, DEFAULT_REPLY_DIR)
    }
}

impl Client {
    pub fn new(server_channel: impl Into<PathBuf>, reply_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_channel: server_channel.into(),
            reply_dir: reply_dir.into(),
        }
    }

    /// Ask the server for the SHA-256 of `target`.
    ///
    /// The path is made absolute before sending so the server resolves the
    /// same file regardless of its working directory. The file's current
    /// length is sent as the declared size.
    pub async fn hash_file(&self, target: &Path) -> Result<Response> {
        let target = tokio::fs::canonicalize(target)
            .await
            .map_err(|e| missing_or_io(target, e))?;
        let meta = tokio::fs::metadata(&target)
            .await
            .map_err(|e| missing_or_io(&target, e))?;
        let declared_size = i64::try_from(meta.len()).unwrap_or(i64::MAX);

        let reply = PrivateChannel::create(&self.reply_dir)?;
        let request = Request::compute(&target, reply.path(), declared_size);
        self.send(&request).await?;

        let bytes = read_reply(reply.path()).await?;
        if bytes.len() < RESPONSE_LEN {
            return Err(HashqError::NoResponse);
        }
        let mut frame = [0u8; RESPONSE_LEN];
        frame.copy_from_slice(&bytes[..RESPONSE_LEN]);
        Ok(Response::decode(&frame))
    }

    /// Fetch the server's cache listing, one entry per line.
    pub async fn query_cache(&self) -> Result<Vec<String>> {
        let reply = PrivateChannel::create(&self.reply_dir)?;
        self.send(&Request::query_cache(reply.path())).await?;

        let bytes = read_reply(reply.path()).await?;
        if bytes.is_empty() {
            return Err(HashqError::NoResponse);
        }
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }

    async fn send(&self, request: &Request) -> Result<()> {
        let frame = request.encode()?;
        let mut sender = transport::connect(&self.server_channel)?;
        sender.write_all(&frame).await?;
        tracing::debug!(kind = %request.kind, channel = %self.server_channel.display(), "Request sent");
        Ok(())
    }
}

/// Read everything the server writes into our reply channel.
///
/// Opening the FIFO for reading blocks until the server opens it for
/// writing, so this runs on a blocking thread.
async fn read_reply(channel: &Path) -> Result<Vec<u8>> {
    let channel = channel.to_path_buf();
    let read = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
        let mut file = std::fs::File::open(&channel)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
    .await
    .map_err(std::io::Error::other)?;
    Ok(read?)
}

fn missing_or_io(path: &Path, e: std::io::Error) -> HashqError {
    if e.kind() == std::io::ErrorKind::NotFound {
        HashqError::TargetMissing(path.to_path_buf())
    } else {
        HashqError::Io(e)
    }
}
