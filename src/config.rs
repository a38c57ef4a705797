use std::path::PathBuf;

use clap::ValueEnum;

use crate::error::{HashqError, Result};

/// Well-known address of the public request channel.
pub const DEFAULT_CHANNEL_PATH: &str = "/tmp/hashq_server.fifo";

/// Directory clients create their private reply channels in.
pub const DEFAULT_REPLY_DIR: &str = "/tmp";

pub const DEFAULT_WORKERS: usize = 4;

/// How concurrent misses for the same path are recorded in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CacheMode {
    /// Every computed hash is inserted, so two in-flight misses for one
    /// path leave two entries behind. Lookups see the newest one.
    #[default]
    AllowDuplicates,
    /// Insertion checks for an existing entry under the write lock and
    /// keeps the first one.
    CheckAndInsert,
}

/// How a cache inspection request is written back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListingMode {
    /// Hold the cache lock while the listing is written. A slow reader
    /// stalls every cache insert until it drains the channel.
    #[default]
    HoldLock,
    /// Copy the entries, release the lock, then write.
    Buffered,
}

/// What happens to queued work on SIGINT/SIGTERM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ShutdownMode {
    /// Remove the public channel and exit. Queued and in-flight jobs are
    /// abandoned without notifying their clients.
    #[default]
    Immediate,
    /// Stop accepting requests, let the workers empty the queue, then exit.
    Drain,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub channel_path: PathBuf,
    pub workers: usize,
    pub cache_mode: CacheMode,
    pub listing_mode: ListingMode,
    pub shutdown_mode: ShutdownMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            channel_path: PathBuf::from(DEFAULT_CHANNEL_PATH),
            workers: DEFAULT_WORKERS,
            cache_mode: CacheMode::default(),
            listing_mode: ListingMode::default(),
            shutdown_mode: ShutdownMode::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(channel_path: impl Into<PathBuf>) -> Self {
        Self {
            channel_path: channel_path.into(),
            ..Default::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn with_listing_mode(mut self, mode: ListingMode) -> Self {
        self.listing_mode = mode;
        self
    }

    pub fn with_shutdown_mode(mut self, mode: ShutdownMode) -> Self {
        self.shutdown_mode = mode;
        self
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(HashqError::Config(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if self.channel_path.as_os_str().is_empty() {
            return Err(HashqError::Config("channel path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_default() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.channel_path, PathBuf::from("/tmp/hashq_server.fifo"));
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.cache_mode, CacheMode::AllowDuplicates);
        assert_eq!(cfg.listing_mode, ListingMode::HoldLock);
        assert_eq!(cfg.shutdown_mode, ShutdownMode::Immediate);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn server_config_builders() {
        let cfg = ServerConfig::new("/run/hashq.fifo")
            .with_workers(8)
            .with_cache_mode(CacheMode::CheckAndInsert)
            .with_listing_mode(ListingMode::Buffered)
            .with_shutdown_mode(ShutdownMode::Drain);
        assert_eq!(cfg.channel_path, PathBuf::from("/run/hashq.fifo"));
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.cache_mode, CacheMode::CheckAndInsert);
        assert_eq!(cfg.listing_mode, ListingMode::Buffered);
        assert_eq!(cfg.shutdown_mode, ShutdownMode::Drain);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let cfg = ServerConfig::default().with_workers(0);
        assert!(matches!(cfg.validate(), Err(HashqError::Config(_))));
    }

    #[test]
    fn empty_channel_path_is_rejected() {
        let cfg = ServerConfig::new("");
        assert!(matches!(cfg.validate(), Err(HashqError::Config(_))));
    }
}
