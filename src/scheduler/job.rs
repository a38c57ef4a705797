use std::cmp::Ordering;
use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::protocol::Request;

/// A compute request waiting for, or held by, a worker.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub request: Request,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(request: Request) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            enqueued_at: Utc::now(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.request.path
    }

    pub fn reply_channel(&self) -> &Path {
        &self.request.reply_channel
    }

    pub fn declared_size(&self) -> i64 {
        self.request.declared_size
    }

    /// Milliseconds spent queued so far.
    pub fn wait_ms(&self) -> i64 {
        (Utc::now() - self.enqueued_at).num_milliseconds()
    }
}

/// Queue slot ranked by `(declared_size, seq)`.
///
/// `seq` is assigned at admission and strictly increases, so equal sizes
/// come out in arrival order.
#[derive(Debug)]
pub struct QueueEntry {
    pub declared_size: i64,
    pub seq: u64,
    pub job: Job,
}

impl QueueEntry {
    pub fn new(job: Job, seq: u64) -> Self {
        Self {
            declared_size: job.declared_size(),
            seq,
            job,
        }
    }

    fn key(&self) -> (i64, u64) {
        (self.declared_size, self.seq)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}
