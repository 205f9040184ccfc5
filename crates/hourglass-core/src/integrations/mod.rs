//! Downstream mirrors for time entries.
//!
//! Each mirror receives a one-way copy of an entry; the local store stays the
//! source of truth. Adapters talk raw HTTP through `reqwest`.

pub mod google_auth;
pub mod notion;
pub mod sheets;
pub mod traits;

pub use google_auth::{ServiceAccountAuth, TokenSource};
pub use notion::{NotionClient, NotionDatabase, NotionMirror};
pub use sheets::{SheetsClient, SheetsMirror};
pub use traits::{HttpMirrorProvider, MirrorProvider, MirrorTarget};

use crate::entry::TimeEntry;

/// Notes when present, otherwise `"<projects> — <date>"`.
pub fn entry_title(entry: &TimeEntry) -> String {
    match entry.notes.as_deref() {
        Some(notes) if !notes.is_empty() => notes.to_string(),
        _ => format!("{} — {}", entry.project_names.join(", "), entry.date),
    }
}

/// Whole minutes, rounded half up.
pub fn duration_minutes(duration_secs: u64) -> u64 {
    duration_secs.saturating_add(30) / 60
}

/// Hours rounded to two decimals.
pub fn duration_hours(duration_secs: u64) -> f64 {
    (duration_secs as f64 / 3600.0 * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::entry::{EntrySource, TimeEntry};
    use crate::sync::SyncStatus;

    /// The 90-minute "Deep Work" entry used across adapter tests.
    pub fn deep_work_entry() -> TimeEntry {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        TimeEntry {
            id: "entry-1".to_string(),
            project_ids: vec!["p-deep".to_string()],
            project_names: vec!["Deep Work".to_string()],
            project_colors: vec![Some("#3B82F6".to_string())],
            duration_secs: 5400,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: None,
            end_time: None,
            notes: None,
            reference_links: vec![],
            tags: vec![],
            source: EntrySource::Timer,
            notion_sync_status: SyncStatus::Pending,
            notion_page_id: None,
            sheets_sync_status: SyncStatus::Pending,
            sheets_row_index: None,
            created_at: created,
            updated_at: created,
        }
    }
}
