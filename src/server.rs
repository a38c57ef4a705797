use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::ResultCache;
use crate::config::{ServerConfig, ShutdownMode};
use crate::digest::{DigestProvider, Sha256Digest};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::protocol::Request;
use crate::scheduler::Scheduler;
use crate::transport::{self, FifoReplies, ReplyChannels};
use crate::worker::{JobExecutor, WorkerPool};

/// Process-wide server state: the admission queue, the cache and the
/// worker pool, shared by every worker and the dispatcher.
pub struct Server {
    config: ServerConfig,
    scheduler: Arc<Scheduler>,
    cache: Arc<ResultCache>,
    digest: Arc<dyn DigestProvider>,
    replies: Arc<dyn ReplyChannels>,
    workers: Option<WorkerPool>,
}

impl Server {
    /// A server hashing with SHA-256 and replying over FIFOs.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_components(config, Arc::new(Sha256Digest), Arc::new(FifoReplies))
    }

    pub fn with_components(
        config: ServerConfig,
        digest: Arc<dyn DigestProvider>,
        replies: Arc<dyn ReplyChannels>,
    ) -> Self {
        Self {
            cache: Arc::new(ResultCache::new(config.cache_mode)),
            scheduler: Arc::new(Scheduler::new()),
            config,
            digest,
            replies,
            workers: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.scheduler.clone(),
            self.cache.clone(),
            self.replies.clone(),
            self.config.listing_mode,
        )
    }

    /// Route a request exactly as if it had arrived on the public channel.
    pub fn submit(&self, request: Request) {
        self.dispatcher().handle(request);
    }

    /// Spawn the worker pool. Calling it again is a no-op.
    pub fn start_workers(&mut self) -> Result<()> {
        if self.workers.is_some() {
            return Ok(());
        }
        let executor = JobExecutor::new(self.cache.clone(), self.digest.clone());
        let pool = WorkerPool::spawn(
            self.config.workers,
            self.scheduler.clone(),
            executor,
            self.replies.clone(),
        )?;
        self.workers = Some(pool);
        Ok(())
    }

    /// Run the server until `shutdown` is cancelled.
    ///
    /// Startup order:
    /// 1. Validate the configuration
    /// 2. Create the public channel (fatal on failure)
    /// 3. Spawn the worker pool
    /// 4. Open the public channel for reading (fatal on failure)
    /// 5. Run the dispatcher loop
    ///
    /// # Errors
    ///
    /// Returns an error if the public channel cannot be created or opened,
    /// or if reading from it fails.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        self.config.validate()?;
        let channel = self.config.channel_path.clone();

        transport::create_channel(&channel)?;
        self.start_workers()?;
        let inbound = match transport::open_inbound(&channel) {
            Ok(inbound) => inbound,
            Err(e) => {
                let _ = transport::remove_channel(&channel);
                return Err(e.into());
            }
        };

        tracing::info!(
            channel = %channel.display(),
            workers = self.config.workers,
            cache_mode = ?self.config.cache_mode,
            listing_mode = ?self.config.listing_mode,
            shutdown_mode = ?self.config.shutdown_mode,
            "Server listening"
        );

        let result = self.dispatcher().run(inbound, shutdown).await;
        self.shutdown().await;
        result
    }

    /// Remove the public channel and stop according to the shutdown mode.
    ///
    /// In [`ShutdownMode::Immediate`] queued jobs are abandoned and worker
    /// threads are left running; the caller is expected to exit the
    /// process. In [`ShutdownMode::Drain`] workers finish the queue and are
    /// joined before this returns.
    pub async fn shutdown(mut self) {
        if let Err(e) = transport::remove_channel(&self.config.channel_path) {
            tracing::warn!(error = %e, "Failed to remove public channel");
        }

        match self.config.shutdown_mode {
            ShutdownMode::Immediate => {
                let abandoned = self.scheduler.len();
                tracing::info!(abandoned, "Shutting down without draining");
            }
            ShutdownMode::Drain => {
                tracing::info!(queued = self.scheduler.len(), "Draining queue before shutdown");
                self.scheduler.close();
                if let Some(pool) = self.workers.take() {
                    if let Err(e) = tokio::task::spawn_blocking(move || pool.join()).await {
                        tracing::error!(error = %e, "Failed to join worker pool");
                    }
                }
                tracing::info!("Queue drained");
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("queued", &self.scheduler.len())
            .field("cached", &self.cache.len())
            .field("workers", &self.workers.as_ref().map(WorkerPool::size))
            .finish()
    }
}
