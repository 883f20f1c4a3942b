//! Background metadata write queue.
//!
//! - **executor**: where a single write runs (dedicated thread, or inline)
//! - **worker**: the FIFO queue and its single draining worker

pub mod executor;
pub mod worker;

pub use executor::{detect_executor, Executor, InlineExecutor, ThreadExecutor, WriteJob};
pub use worker::{MetadataWriteQueue, QueueState, WriteObserver, WriteOutcome};
