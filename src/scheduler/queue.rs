use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::scheduler::job::{Job, QueueEntry};

/// Shortest-job-first ordering of pending jobs.
///
/// Not synchronised; [`Scheduler`](crate::scheduler::Scheduler) wraps it in
/// a lock. There is no capacity limit.
#[derive(Debug, Default)]
pub struct JobQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    next_seq: u64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a job. Returns its arrival sequence number.
    pub fn push(&mut self, job: Job) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(QueueEntry::new(job, seq)));
        seq
    }

    /// Remove the smallest declared size, earliest arrival first on ties.
    pub fn pop(&mut self) -> Option<Job> {
        self.heap.pop().map(|Reverse(entry)| entry.job)
    }

    pub fn peek(&self) -> Option<&Job> {
        self.heap.peek().map(|Reverse(entry)| &entry.job)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
