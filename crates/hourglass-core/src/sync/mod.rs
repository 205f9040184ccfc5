//! Mirror synchronization.
//!
//! Every entry carries an independent status per downstream target. The
//! orchestrator pushes entries through [`crate::integrations::MirrorTarget`]
//! implementations and records the outcome; the worker runs those pushes in
//! the background when entries change.

pub mod orchestrator;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::SyncOrchestrator;
pub use types::{BulkSyncReport, RemoteLocator, SyncError, SyncStatus, SyncTarget};
pub use worker::{SyncHandle, SyncJob, SyncWorker};
