//! Change-coalescing synchronization.
//!
//! Change notifications flow through four stages:
//!
//! 1. [`filter::EventFilter`] turns an event into the record IDs worth syncing.
//! 2. [`queue::CoalescingQueue`] merges them into a single pending batch and
//!    (re)arms the debounce timer.
//! 3. [`scheduler::SyncScheduler`] hands an idle-stable batch to the runner,
//!    never running two passes at once, and drains work that went idle while
//!    a pass was executing.
//! 4. [`runner::ItemSyncRunner`] writes each record to the note database with
//!    per-item failure isolation.
//!
//! [`service::SyncService`] wires the stages to an event source.

pub mod debounce;
pub mod filter;
pub mod progress;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod service;

use crate::library::LibraryError;
use crate::wolai::RemoteError;
use thiserror::Error;

pub use filter::EventFilter;
pub use progress::{BatchReport, ItemOutcome, ProgressReporter, TracingProgress};
pub use queue::CoalescingQueue;
pub use runner::{BatchRunner, ItemSyncRunner};
pub use scheduler::{SchedulerHandle, SchedulerSnapshot, SchedulerState, SyncScheduler};
pub use service::SyncService;

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Configuration(String),
    #[error("failed to fetch database schema: {0}")]
    SchemaFetch(#[source] RemoteError),
}

/// Errors confined to a single record.
#[derive(Debug, Error)]
pub enum ItemSyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Library(#[from] LibraryError),
}
