pub mod admission;
pub mod job;
pub mod queue;

pub use admission::Scheduler;
pub use job::{Job, QueueEntry};
pub use queue::JobQueue;
