use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::scheduler::job::Job;
use crate::scheduler::queue::JobQueue;

#[derive(Debug, Default)]
struct AdmissionState {
    queue: JobQueue,
    closed: bool,
}

/// Blocking admission queue shared by the dispatcher and every worker.
///
/// `enqueue` wakes exactly one waiting worker. Waiters re-check the queue
/// after every wakeup, so a wakeup that finds nothing to do (spurious, or
/// raced by another worker) simply goes back to sleep.
#[derive(Debug, Default)]
pub struct Scheduler {
    state: Mutex<AdmissionState>,
    available: Condvar,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AdmissionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a job. Never blocks on capacity. Returns its arrival sequence.
    pub fn enqueue(&self, job: Job) -> u64 {
        let mut state = self.lock();
        let seq = state.queue.push(job);
        self.available.notify_one();
        seq
    }

    /// Block until a job is available and take the smallest one.
    ///
    /// Returns `None` only after [`close`](Self::close) once the queue is
    /// empty, which is how draining workers learn to exit.
    pub fn dequeue_blocking(&self) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if let Some(job) = state.queue.pop() {
                return Some(job);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking variant of [`dequeue_blocking`](Self::dequeue_blocking).
    pub fn try_dequeue(&self) -> Option<Job> {
        self.lock().queue.pop()
    }

    /// Stop blocking idle workers. Queued jobs are still handed out.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Request;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn close_releases_idle_waiter() {
        let scheduler = Arc::new(Scheduler::new());
        let waiter = {
            let scheduler = scheduler.clone();
            std::thread::spawn(move || scheduler.dequeue_blocking())
        };

        std::thread::sleep(Duration::from_millis(50));
        scheduler.close();
        assert!(waiter.join().unwrap().is_none());
    }

    #[test]
    fn closed_scheduler_still_hands_out_queued_jobs() {
        let scheduler = Scheduler::new();
        scheduler.enqueue(Job::new(Request::compute("/a", "/r", 1)));
        scheduler.close();

        assert!(scheduler.is_closed());
        assert!(scheduler.dequeue_blocking().is_some());
        assert!(scheduler.dequeue_blocking().is_none());
    }
}
