use std::sync::Arc;

use crate::cache::ResultCache;
use crate::digest::{to_hex, DigestProvider};
use crate::protocol::Response;
use crate::scheduler::Job;

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    CacheHit,
    Computed,
    FileNotFound,
    Unreadable,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::CacheHit => write!(f, "cache_hit"),
            Outcome::Computed => write!(f, "computed"),
            Outcome::FileNotFound => write!(f, "file_not_found"),
            Outcome::Unreadable => write!(f, "unreadable"),
        }
    }
}

/// Result of job execution
#[derive(Debug)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub response: Response,
}

/// Turns a dequeued job into a response, consulting and filling the cache.
#[derive(Clone)]
pub struct JobExecutor {
    cache: Arc<ResultCache>,
    digest: Arc<dyn DigestProvider>,
}

impl JobExecutor {
    pub fn new(cache: Arc<ResultCache>, digest: Arc<dyn DigestProvider>) -> Self {
        Self { cache, digest }
    }

    pub fn execute(&self, job: &Job) -> ExecutionResult {
        let path = job.path();

        if let Some(hash) = self.cache.lookup(path) {
            tracing::debug!(job_id = %job.id, path = %path.display(), "Cache hit");
            return ExecutionResult {
                outcome: Outcome::CacheHit,
                response: Response::cached(hash),
            };
        }

        // Checked now, not at admission: the file may have changed since
        // the client sent the request.
        if !path.exists() {
            tracing::warn!(job_id = %job.id, path = %path.display(), "File not found");
            return ExecutionResult {
                outcome: Outcome::FileNotFound,
                response: Response::not_found(),
            };
        }

        match self.digest.digest(path) {
            Ok(raw) => {
                let hash = to_hex(&raw);
                let inserted = self.cache.insert(path.to_path_buf(), hash.clone());
                tracing::debug!(
                    job_id = %job.id,
                    path = %path.display(),
                    inserted,
                    "Hash computed"
                );
                ExecutionResult {
                    outcome: Outcome::Computed,
                    response: Response::computed(hash),
                }
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job.id,
                    path = %path.display(),
                    error = %e,
                    "Failed to read file"
                );
                ExecutionResult {
                    outcome: Outcome::Unreadable,
                    response: Response::unreadable(),
                }
            }
        }
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("cache_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}
