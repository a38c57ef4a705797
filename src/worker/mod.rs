//! Worker pool that turns queued jobs into responses.
//!
//! Each worker runs the same loop on its own OS thread:
//!
//! 1. Block on [`Scheduler::dequeue_blocking`](crate::scheduler::Scheduler::dequeue_blocking)
//! 2. [`JobExecutor::execute`]: cache lookup, existence check, digest, cache insert
//! 3. [`deliver`] the fixed-size response to the job's reply channel
//!
//! Delivery failures are logged and dropped; the worker moves on to its
//! next job.

pub mod executor;
pub mod pool;

pub use executor::{ExecutionResult, JobExecutor, Outcome};
pub use pool::{deliver, WorkerPool};
