//! Core types for mirror synchronization.

use serde::{Deserialize, Serialize};

/// A downstream mirror an entry can be pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTarget {
    Notion,
    Sheets,
}

impl SyncTarget {
    pub const ALL: [SyncTarget; 2] = [SyncTarget::Notion, SyncTarget::Sheets];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTarget::Notion => "notion",
            SyncTarget::Sheets => "sheets",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SyncTarget::Notion => "Notion",
            SyncTarget::Sheets => "Google Sheets",
        }
    }

    /// Column holding this target's status in `time_entries`.
    pub(crate) fn status_column(&self) -> &'static str {
        match self {
            SyncTarget::Notion => "notion_sync_status",
            SyncTarget::Sheets => "sheets_sync_status",
        }
    }
}

impl std::fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "notion" => Ok(SyncTarget::Notion),
            "sheets" | "google" | "google_sheets" => Ok(SyncTarget::Sheets),
            other => Err(format!("unknown sync target: {other} (expected notion or sheets)")),
        }
    }
}

/// Outcome of the most recent push of an entry to one target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Awaiting first sync, or re-sync after an edit.
    #[default]
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }

    /// Unknown values read back from storage are treated as pending so that
    /// the next sweep picks them up.
    pub fn from_db(s: &str) -> Self {
        match s {
            "synced" => SyncStatus::Synced,
            "failed" => SyncStatus::Failed,
            _ => SyncStatus::Pending,
        }
    }

    /// Whether a bulk sweep should re-drive an entry in this state.
    pub fn needs_sync(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Failed)
    }
}

/// Address of an entry's mirror record on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RemoteLocator {
    NotionPage(String),
    /// 1-based spreadsheet row.
    SheetRow(u32),
}

impl RemoteLocator {
    pub fn target(&self) -> SyncTarget {
        match self {
            RemoteLocator::NotionPage(_) => SyncTarget::Notion,
            RemoteLocator::SheetRow(_) => SyncTarget::Sheets,
        }
    }
}

/// Counts returned by a bulk sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSyncReport {
    pub synced: usize,
    pub failed: usize,
}

/// Remote mirror failures. Always caught at the adapter boundary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{service} API error (HTTP {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Locator {0:?} does not belong to this target")]
    WrongLocator(RemoteLocator),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_db_text() {
        for status in [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Failed] {
            assert_eq!(SyncStatus::from_db(status.as_str()), status);
        }
        assert_eq!(SyncStatus::from_db("garbage"), SyncStatus::Pending);
    }

    #[test]
    fn only_pending_and_failed_need_sync() {
        assert!(SyncStatus::Pending.needs_sync());
        assert!(SyncStatus::Failed.needs_sync());
        assert!(!SyncStatus::Synced.needs_sync());
    }

    #[test]
    fn target_parses_aliases() {
        assert_eq!("Notion".parse::<SyncTarget>().unwrap(), SyncTarget::Notion);
        assert_eq!("google".parse::<SyncTarget>().unwrap(), SyncTarget::Sheets);
        assert!("linear".parse::<SyncTarget>().is_err());
    }

    #[test]
    fn report_serializes_as_counts() {
        let json = serde_json::to_value(BulkSyncReport { synced: 2, failed: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({ "synced": 2, "failed": 1 }));
    }
}
