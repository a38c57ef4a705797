use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio_util::sync::CancellationToken;

use crate::cache::ResultCache;
use crate::config::ListingMode;
use crate::error::{HashqError, Result};
use crate::protocol::{Request, RequestKind, REQUEST_LEN};
use crate::scheduler::{Job, Scheduler};
use crate::transport::ReplyChannels;

/// Routes inbound requests: compute jobs go to the scheduler, cache
/// inspections are answered on the dispatcher's own thread.
#[derive(Clone)]
pub struct Dispatcher {
    scheduler: Arc<Scheduler>,
    cache: Arc<ResultCache>,
    replies: Arc<dyn ReplyChannels>,
    listing_mode: ListingMode,
}

impl Dispatcher {
    pub fn new(
        scheduler: Arc<Scheduler>,
        cache: Arc<ResultCache>,
        replies: Arc<dyn ReplyChannels>,
        listing_mode: ListingMode,
    ) -> Self {
        Self {
            scheduler,
            cache,
            replies,
            listing_mode,
        }
    }

    /// Handle one decoded request. Blocks while a cache listing is written.
    pub fn handle(&self, request: Request) {
        match request.kind {
            RequestKind::Compute => {
                tracing::info!(
                    path = %request.path.display(),
                    declared_size = request.declared_size,
                    "Compute request received"
                );
                let job = Job::new(request);
                let job_id = job.id;
                let seq = self.scheduler.enqueue(job);
                tracing::debug!(job_id = %job_id, seq, queued = self.scheduler.len(), "Job queued");
            }
            RequestKind::QueryCache => {
                tracing::info!(reply = %request.reply_channel.display(), "Cache inspection request received");
                if let Err(e) = self.serve_listing(&request) {
                    tracing::warn!(error = %e, "Cache listing not delivered");
                }
            }
            RequestKind::Unknown(code) => {
                // No reply channel contract exists for unknown kinds; the
                // request is dropped without telling anyone.
                tracing::debug!(code, "Ignoring request of unknown kind");
            }
        }
    }

    /// Open the requester's channel and write the cache listing into it.
    pub fn serve_listing(&self, request: &Request) -> Result<usize> {
        let channel = &request.reply_channel;
        let delivery_error = |source| HashqError::Delivery {
            path: channel.clone(),
            source,
        };
        let mut writer = self.replies.open(channel).map_err(delivery_error)?;
        let lines = self
            .cache
            .write_listing(&mut writer, self.listing_mode)
            .map_err(delivery_error)?;
        tracing::debug!(reply = %channel.display(), lines, "Cache listing sent");
        Ok(lines)
    }

    /// Read fixed-size requests from the public channel until cancelled.
    ///
    /// Cache inspections run to completion before the next request is read,
    /// on a blocking thread because opening the reply channel waits for the
    /// client.
    pub async fn run(self, mut inbound: pipe::Receiver, shutdown: CancellationToken) -> Result<()> {
        let mut frame = [0u8; REQUEST_LEN];
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Dispatcher stopping");
                    return Ok(());
                }
                read = inbound.read_exact(&mut frame) => {
                    read?;
                }
            }

            let request = Request::decode(&frame);
            if request.kind == RequestKind::QueryCache {
                let dispatcher = self.clone();
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Dispatcher stopping during cache listing");
                        return Ok(());
                    }
                    joined = tokio::task::spawn_blocking(move || dispatcher.handle(request)) => {
                        if let Err(e) = joined {
                            tracing::error!(error = %e, "Cache listing task failed");
                        }
                    }
                }
            } else {
                self.handle(request);
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listing_mode", &self.listing_mode)
            .finish_non_exhaustive()
    }
}
