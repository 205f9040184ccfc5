//! # Hourglass Core Library
//!
//! Core logic for Hourglass, a personal time tracker. Time is captured with a
//! timer or entered by hand, stored locally in SQLite, and optionally mirrored
//! one way to a Notion database and a Google Sheets spreadsheet.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine; the committed
//!   duration is recomputed from timestamps, never accumulated from ticks
//! - **Storage**: SQLite store for projects, entries, settings and session state
//! - **Integrations**: Notion and Google Sheets mirror adapters behind the
//!   [`MirrorTarget`] trait
//! - **Sync**: Per-entry, per-target status tracking, single and bulk sync,
//!   and a background worker for fire-and-forget pushes
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Database`]: Entry, project and settings persistence
//! - [`EntryService`]: Entry mutation API that triggers mirror syncs
//! - [`SyncOrchestrator`]: Drives entries to their mirrors

pub mod entry;
pub mod error;
pub mod events;
pub mod integrations;
pub mod service;
pub mod storage;
pub mod sync;
pub mod timer;

pub use entry::{
    EntryFilter, EntryPatch, EntrySource, NewEntry, NewProject, Project, ProjectPatch, TimeEntry,
};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use integrations::{HttpMirrorProvider, MirrorProvider, MirrorTarget};
pub use service::EntryService;
pub use storage::{Database, SharedDatabase, Settings};
pub use sync::{
    BulkSyncReport, RemoteLocator, SyncError, SyncHandle, SyncJob, SyncOrchestrator, SyncStatus,
    SyncTarget, SyncWorker,
};
pub use timer::{format_duration, TimerEngine, TimerState};
