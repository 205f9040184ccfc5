//! In-memory mirrors for exercising sync without a network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use crate::entry::{EntrySource, NewEntry, NewProject, TimeEntry};
use crate::integrations::{MirrorProvider, MirrorTarget};
use crate::storage::settings::{
    GOOGLE_SERVICE_ACCOUNT, GOOGLE_SPREADSHEET_ID, NOTION_DATABASE_ID, NOTION_TOKEN,
};
use crate::storage::{Database, SharedDatabase, Settings};

use super::types::{RemoteLocator, SyncError, SyncTarget};

#[derive(Default)]
struct Remote {
    /// Live records: locator -> entry id.
    records: BTreeMap<String, String>,
    removed: Vec<RemoteLocator>,
    calls: usize,
    created: u32,
}

/// A mirror that keeps its records in memory.
pub(crate) struct FakeMirror {
    target: SyncTarget,
    remote: Mutex<Remote>,
    failing: AtomicBool,
}

impl FakeMirror {
    pub fn new(target: SyncTarget) -> Self {
        Self {
            target,
            remote: Mutex::new(Remote::default()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn record_count(&self) -> usize {
        self.remote.lock().unwrap().records.len()
    }

    pub fn records_for(&self, entry_id: &str) -> usize {
        let remote = self.remote.lock().unwrap();
        remote.records.values().filter(|id| *id == entry_id).count()
    }

    pub fn calls(&self) -> usize {
        self.remote.lock().unwrap().calls
    }

    pub fn removed(&self) -> Vec<RemoteLocator> {
        self.remote.lock().unwrap().removed.clone()
    }

    fn fail_if_needed(&self) -> Result<(), SyncError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Api {
                service: "Fake",
                status: 503,
                message: "remote unavailable".into(),
            });
        }
        Ok(())
    }
}

fn key(locator: &RemoteLocator) -> String {
    match locator {
        RemoteLocator::NotionPage(id) => id.clone(),
        RemoteLocator::SheetRow(row) => row.to_string(),
    }
}

#[async_trait]
impl MirrorTarget for FakeMirror {
    fn target(&self) -> SyncTarget {
        self.target
    }

    async fn upsert(&self, entry: &TimeEntry) -> Result<RemoteLocator, SyncError> {
        let mut remote = self.remote.lock().unwrap();
        remote.calls += 1;
        self.fail_if_needed()?;

        let locator = match entry.locator(self.target) {
            Some(locator) => locator,
            None => {
                remote.created += 1;
                match self.target {
                    SyncTarget::Notion => RemoteLocator::NotionPage(format!("page-{}", remote.created)),
                    // Row 1 holds the header.
                    SyncTarget::Sheets => RemoteLocator::SheetRow(remote.created + 1),
                }
            }
        };
        remote.records.insert(key(&locator), entry.id.clone());
        Ok(locator)
    }

    async fn remove(&self, locator: &RemoteLocator) -> Result<(), SyncError> {
        let mut remote = self.remote.lock().unwrap();
        remote.calls += 1;
        self.fail_if_needed()?;
        remote.records.remove(&key(locator));
        remote.removed.push(locator.clone());
        Ok(())
    }

    async fn provision(&self) -> Result<(), SyncError> {
        let mut remote = self.remote.lock().unwrap();
        remote.calls += 1;
        self.fail_if_needed()
    }
}

/// Hands out the fake mirrors, but only for targets the settings configure.
pub(crate) struct FakeProvider {
    pub notion: Arc<FakeMirror>,
    pub sheets: Arc<FakeMirror>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            notion: Arc::new(FakeMirror::new(SyncTarget::Notion)),
            sheets: Arc::new(FakeMirror::new(SyncTarget::Sheets)),
        }
    }
}

impl MirrorProvider for FakeProvider {
    fn mirror(&self, target: SyncTarget, settings: &Settings) -> Option<Arc<dyn MirrorTarget>> {
        match target {
            SyncTarget::Notion if settings.notion.is_some() => {
                Some(self.notion.clone() as Arc<dyn MirrorTarget>)
            }
            SyncTarget::Sheets if settings.sheets.is_some() => {
                Some(self.sheets.clone() as Arc<dyn MirrorTarget>)
            }
            _ => None,
        }
    }
}

/// Store settings that make `target` count as configured.
pub(crate) fn configure(db: &SharedDatabase, target: SyncTarget) {
    let db = db.lock().unwrap();
    match target {
        SyncTarget::Notion => {
            db.set_setting(NOTION_TOKEN, &json!("secret_test")).unwrap();
            db.set_setting(NOTION_DATABASE_ID, &json!("db-test")).unwrap();
        }
        SyncTarget::Sheets => {
            db.set_setting(
                GOOGLE_SERVICE_ACCOUNT,
                &json!({
                    "client_email": "bot@test.iam.gserviceaccount.com",
                    "private_key": "unused",
                }),
            )
            .unwrap();
            db.set_setting(GOOGLE_SPREADSHEET_ID, &json!("sheet-test"))
                .unwrap();
        }
    }
}

pub(crate) fn deep_work_input(project_id: &str) -> NewEntry {
    NewEntry {
        project_ids: vec![project_id.to_string()],
        duration_secs: 5400,
        date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        start_time: None,
        end_time: None,
        notes: None,
        reference_links: vec![],
        tags: vec![],
        source: EntrySource::Manual,
    }
}

/// In-memory store with a "Deep Work" project and `count` entries.
pub(crate) fn seeded_db(count: usize) -> (SharedDatabase, Vec<String>) {
    let db = Database::open_in_memory().unwrap();
    let project = db
        .create_project(&NewProject {
            name: "Deep Work".into(),
            ..Default::default()
        })
        .unwrap();
    let ids = (0..count)
        .map(|_| db.insert_entry(&deep_work_input(&project.id)).unwrap().id)
        .collect();
    (db.into_shared(), ids)
}
