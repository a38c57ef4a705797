pub mod cache;
pub mod client;
pub mod config;
pub mod digest;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod scheduler;
pub mod server;
pub mod shutdown;
pub mod transport;
pub mod worker;

pub use error::{HashqError, Result};
