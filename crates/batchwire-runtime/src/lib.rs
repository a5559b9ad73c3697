pub mod batcher;
pub mod config;
pub mod deployment;
pub mod discovery;
pub mod error;
pub mod lazy;
pub mod request;
pub mod scheduler;
pub mod transport;

pub use batcher::{Batch, BatchPolicy};
pub use config::*;
pub use deployment::*;
pub use discovery::*;
pub use error::*;
pub use lazy::*;
pub use request::*;
pub use scheduler::{BatchScheduler, SchedulerStats};
pub use transport::*;
