//! Time entries and projects.
//!
//! A [`TimeEntry`] is the only durable artifact of tracked time. Its
//! `duration_secs` is authoritative; start/end timestamps are informational
//! and may be absent for manual entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::sync::{RemoteLocator, SyncStatus, SyncTarget};

/// How an entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    Timer,
    Manual,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Timer => "timer",
            EntrySource::Manual => "manual",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "timer" => EntrySource::Timer,
            _ => EntrySource::Manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub project_ids: Vec<String>,
    pub project_names: Vec<String>,
    pub project_colors: Vec<Option<String>>,
    pub duration_secs: u64,
    pub date: NaiveDate,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub reference_links: Vec<String>,
    pub tags: Vec<String>,
    pub source: EntrySource,
    pub notion_sync_status: SyncStatus,
    pub notion_page_id: Option<String>,
    pub sheets_sync_status: SyncStatus,
    pub sheets_row_index: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    pub fn sync_status(&self, target: SyncTarget) -> SyncStatus {
        match target {
            SyncTarget::Notion => self.notion_sync_status,
            SyncTarget::Sheets => self.sheets_sync_status,
        }
    }

    /// Remote record this entry is mirrored to, if one was created.
    pub fn locator(&self, target: SyncTarget) -> Option<RemoteLocator> {
        match target {
            SyncTarget::Notion => self
                .notion_page_id
                .clone()
                .map(RemoteLocator::NotionPage),
            SyncTarget::Sheets => self.sheets_row_index.map(RemoteLocator::SheetRow),
        }
    }
}

/// Largest duration an entry may carry: one year of continuous tracking.
pub const MAX_DURATION_SECS: u64 = 366 * 24 * 3600;

/// Input for creating an entry (timer result or manual form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub project_ids: Vec<String>,
    pub duration_secs: u64,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reference_links: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: EntrySource,
}

impl NewEntry {
    /// Entry for a stopped timer run: the run is taken to end at `stopped_at`
    /// and to have started `duration_secs` earlier.
    pub fn from_timer(
        project_ids: Vec<String>,
        duration_secs: u64,
        stopped_at: DateTime<Utc>,
        date: NaiveDate,
    ) -> Self {
        let started_at = stopped_at - chrono::Duration::seconds(duration_secs as i64);
        Self {
            project_ids,
            duration_secs,
            date,
            start_time: Some(started_at),
            end_time: Some(stopped_at),
            notes: None,
            reference_links: Vec::new(),
            tags: Vec::new(),
            source: EntrySource::Timer,
        }
    }

    /// Trim free text and drop blank notes, links and tags.
    pub fn normalized(mut self) -> Self {
        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.reference_links = clean_list(self.reference_links);
        self.tags = clean_list(self.tags);
        let mut seen = Vec::with_capacity(self.project_ids.len());
        for id in self.project_ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        self.project_ids = seen;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_ids.is_empty() {
            return Err(ValidationError::EmptyCollection(
                "an entry needs at least one project".to_string(),
            ));
        }
        if self.duration_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.duration_secs > MAX_DURATION_SECS {
            return Err(ValidationError::InvalidValue {
                field: "duration".to_string(),
                message: format!("must be at most {MAX_DURATION_SECS} seconds"),
            });
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end < start {
                return Err(ValidationError::InvalidTimeRange { start, end });
            }
        }
        Ok(())
    }
}

/// Partial update of an entry. `None` leaves a field unchanged; for nullable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub project_ids: Option<Vec<String>>,
    pub duration_secs: Option<u64>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<Option<DateTime<Utc>>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
    pub reference_links: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub source: Option<EntrySource>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    /// Merge the patch over an existing entry.
    pub fn apply(self, entry: &TimeEntry) -> NewEntry {
        NewEntry {
            project_ids: self.project_ids.unwrap_or_else(|| entry.project_ids.clone()),
            duration_secs: self.duration_secs.unwrap_or(entry.duration_secs),
            date: self.date.unwrap_or(entry.date),
            start_time: self.start_time.unwrap_or(entry.start_time),
            end_time: self.end_time.unwrap_or(entry.end_time),
            notes: self.notes.unwrap_or_else(|| entry.notes.clone()),
            reference_links: self
                .reference_links
                .unwrap_or_else(|| entry.reference_links.clone()),
            tags: self.tags.unwrap_or_else(|| entry.tags.clone()),
            source: self.source.unwrap_or(entry.source),
        }
        .normalized()
    }
}

/// Filters for listing entries. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub project_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if let Some(color) = &self.color {
            validate_color(color)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
}

/// Projects created by `project seed`.
pub const DEFAULT_PROJECTS: &[(&str, &str)] = &[
    ("Deep Work", "#3B82F6"),
    ("Meetings", "#8B5CF6"),
    ("Admin", "#F59E0B"),
    ("Learning", "#10B981"),
    ("Exercise", "#84CC16"),
    ("Home", "#EF4444"),
];

/// Accepts `#RGB` or `#RRGGBB`.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let hex = color.strip_prefix('#').unwrap_or("");
    if matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "color".to_string(),
            message: format!("'{color}' is not a hex color like #3B82F6"),
        })
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
