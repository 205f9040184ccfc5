//! Entry and project operations with mirror side effects.
//!
//! Every mutation succeeds or fails on the local store alone. Mirror work is
//! queued on the [`SyncHandle`] after the local write commits.

use crate::entry::{
    validate_color, EntryFilter, EntryPatch, NewEntry, NewProject, Project, ProjectPatch,
    TimeEntry,
};
use crate::error::{CoreError, Result, ValidationError};
use crate::storage::database::lock;
use crate::storage::{Database, SharedDatabase, Settings};
use crate::sync::{SyncHandle, SyncJob, SyncTarget};

pub struct EntryService {
    db: SharedDatabase,
    sync: Option<SyncHandle>,
}

impl EntryService {
    /// Without a handle, writes stay local and mirrors catch up on the next
    /// bulk sync.
    pub fn new(db: SharedDatabase, sync: Option<SyncHandle>) -> Self {
        Self { db, sync }
    }

    pub fn db(&self) -> &SharedDatabase {
        &self.db
    }

    // ── Entries ──────────────────────────────────────────────────────

    pub fn create(&self, input: NewEntry) -> Result<TimeEntry> {
        let input = input.normalized();
        input.validate()?;

        let entry = {
            let db = lock(&self.db)?;
            check_projects(&db, &input.project_ids, &[])?;
            db.insert_entry(&input)?
        };
        tracing::info!(entry_id = %entry.id, duration_secs = entry.duration_secs, "entry created");

        self.schedule_upserts(&entry.id)?;
        Ok(entry)
    }

    /// Apply `patch` and reset every target to pending.
    pub fn update(&self, id: &str, patch: EntryPatch) -> Result<TimeEntry> {
        let entry = {
            let db = lock(&self.db)?;
            let current = db
                .get_entry(id)?
                .ok_or_else(|| CoreError::entry_not_found(id))?;
            let merged = patch.apply(&current);
            merged.validate()?;
            check_projects(&db, &merged.project_ids, &current.project_ids)?;
            db.update_entry(id, &merged)?
                .ok_or_else(|| CoreError::entry_not_found(id))?
        };
        tracing::info!(entry_id = %entry.id, "entry updated");

        self.schedule_upserts(&entry.id)?;
        Ok(entry)
    }

    /// Delete locally, then queue removal of any remote records.
    pub fn delete(&self, id: &str) -> Result<()> {
        let (entry, settings) = {
            let db = lock(&self.db)?;
            let entry = db
                .delete_entry(id)?
                .ok_or_else(|| CoreError::entry_not_found(id))?;
            (entry, Settings::load(&db)?)
        };
        tracing::info!(entry_id = %entry.id, "entry deleted");

        let Some(sync) = &self.sync else {
            return Ok(());
        };
        for target in SyncTarget::ALL {
            if !is_configured(&settings, target) {
                continue;
            }
            if let Some(locator) = entry.locator(target) {
                sync.submit(SyncJob::Remove { locator });
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<TimeEntry> {
        lock(&self.db)?
            .get_entry(id)?
            .ok_or_else(|| CoreError::entry_not_found(id))
    }

    pub fn list(&self, filter: &EntryFilter) -> Result<Vec<TimeEntry>> {
        Ok(lock(&self.db)?.list_entries(filter)?)
    }

    fn schedule_upserts(&self, entry_id: &str) -> Result<()> {
        let Some(sync) = &self.sync else {
            return Ok(());
        };
        let settings = {
            let db = lock(&self.db)?;
            Settings::load(&db)?
        };

        if settings.notion_auto_sync() {
            sync.submit(SyncJob::Upsert {
                target: SyncTarget::Notion,
                entry_id: entry_id.to_string(),
            });
        }
        if settings.sheets.is_some() {
            sync.submit(SyncJob::Upsert {
                target: SyncTarget::Sheets,
                entry_id: entry_id.to_string(),
            });
        }
        Ok(())
    }

    // ── Projects ─────────────────────────────────────────────────────

    pub fn create_project(&self, input: NewProject) -> Result<Project> {
        input.validate()?;
        let db = lock(&self.db)?;
        ensure_name_free(&db, &input.name, None)?;
        let project = db.create_project(&input)?;
        tracing::info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Projects in creation order.
    pub fn list_projects(&self, include_archived: bool) -> Result<Vec<Project>> {
        Ok(lock(&self.db)?.list_projects(include_archived)?)
    }

    pub fn get_project(&self, id: &str) -> Result<Project> {
        lock(&self.db)?
            .get_project(id)?
            .ok_or_else(|| CoreError::project_not_found(id))
    }

    /// Look a project up by id, falling back to a case-insensitive name match.
    pub fn resolve_project(&self, id_or_name: &str) -> Result<Project> {
        let db = lock(&self.db)?;
        if let Some(project) = db.get_project(id_or_name)? {
            return Ok(project);
        }
        db.find_project_by_name(id_or_name)?
            .ok_or_else(|| CoreError::project_not_found(id_or_name))
    }

    pub fn update_project(&self, id: &str, patch: ProjectPatch) -> Result<Project> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "name".to_string(),
                    message: "must not be empty".to_string(),
                }
                .into());
            }
        }
        if let Some(Some(color)) = &patch.color {
            validate_color(color)?;
        }

        let db = lock(&self.db)?;
        if let Some(name) = &patch.name {
            ensure_name_free(&db, name, Some(id))?;
        }
        db.update_project(id, &patch)?
            .ok_or_else(|| CoreError::project_not_found(id))
    }

    pub fn set_project_archived(&self, id: &str, archived: bool) -> Result<Project> {
        let project = lock(&self.db)?
            .set_project_archived(id, archived)?
            .ok_or_else(|| CoreError::project_not_found(id))?;
        tracing::info!(project_id = %project.id, archived, "project archive flag changed");
        Ok(project)
    }

    /// Create the default projects that are missing; returns how many were added.
    pub fn seed_default_projects(&self) -> Result<usize> {
        Ok(lock(&self.db)?.seed_default_projects()?)
    }
}

fn is_configured(settings: &Settings, target: SyncTarget) -> bool {
    match target {
        SyncTarget::Notion => settings.notion.is_some(),
        SyncTarget::Sheets => settings.sheets.is_some(),
    }
}

/// Every referenced project must exist; archived ones are only accepted if
/// the entry already had them.
fn check_projects(db: &Database, project_ids: &[String], already_linked: &[String]) -> Result<()> {
    for id in project_ids {
        let project = db
            .get_project(id)?
            .ok_or_else(|| CoreError::project_not_found(id.as_str()))?;
        if project.archived && !already_linked.contains(id) {
            return Err(ValidationError::InvalidValue {
                field: "project_ids".to_string(),
                message: format!("project '{}' is archived", project.name),
            }
            .into());
        }
    }
    Ok(())
}

fn ensure_name_free(db: &Database, name: &str, except_id: Option<&str>) -> Result<()> {
    match db.find_project_by_name(name.trim())? {
        Some(existing) if Some(existing.id.as_str()) != except_id => {
            Err(ValidationError::InvalidValue {
                field: "name".to_string(),
                message: format!("a project named '{}' already exists", existing.name),
            }
            .into())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sync::testing::{configure, deep_work_input, FakeProvider};
    use crate::sync::{SyncOrchestrator, SyncStatus, SyncWorker};

    fn service() -> (EntryService, Project) {
        let db = Database::open_in_memory().unwrap().into_shared();
        let service = EntryService::new(db, None);
        let project = service
            .create_project(NewProject {
                name: "Deep Work".into(),
                ..Default::default()
            })
            .unwrap();
        (service, project)
    }

    #[test]
    fn create_validates_and_stores() {
        let (service, project) = service();
        let entry = service.create(deep_work_input(&project.id)).unwrap();
        assert_eq!(entry.project_names, vec!["Deep Work"]);
        assert_eq!(service.list(&EntryFilter::default()).unwrap().len(), 1);

        let mut empty = deep_work_input(&project.id);
        empty.project_ids.clear();
        assert!(matches!(
            service.create(empty),
            Err(CoreError::Validation(ValidationError::EmptyCollection(_)))
        ));

        assert!(matches!(
            service.create(deep_work_input("missing")),
            Err(CoreError::NotFound { kind: "Project", .. })
        ));
    }

    #[test]
    fn archived_projects_rejected_for_new_entries_only() {
        let (service, project) = service();
        let entry = service.create(deep_work_input(&project.id)).unwrap();
        service.set_project_archived(&project.id, true).unwrap();

        assert!(matches!(
            service.create(deep_work_input(&project.id)),
            Err(CoreError::Validation(_))
        ));

        let updated = service
            .update(
                &entry.id,
                EntryPatch {
                    notes: Some(Some("kept archived project".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.project_ids, vec![project.id]);
    }

    #[test]
    fn update_missing_entry_is_not_found() {
        let (service, _) = service();
        let err = service
            .update(
                "missing",
                EntryPatch {
                    duration_secs: Some(60),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Time entry", .. }));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let (service, project) = service();
        let entry = service.create(deep_work_input(&project.id)).unwrap();
        service.delete(&entry.id).unwrap();
        assert!(matches!(service.get(&entry.id), Err(CoreError::NotFound { .. })));
        assert!(service.delete(&entry.id).is_err());
    }

    #[test]
    fn duplicate_project_names_rejected() {
        let (service, project) = service();
        let err = service
            .create_project(NewProject {
                name: "deep work".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let renamed = service
            .update_project(
                &project.id,
                ProjectPatch {
                    name: Some("Deep Work".into()),
                    color: Some(Some("#112233".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.color.as_deref(), Some("#112233"));
    }

    #[test]
    fn resolve_project_by_id_or_name() {
        let (service, project) = service();
        assert_eq!(service.resolve_project(&project.id).unwrap(), project);
        assert_eq!(service.resolve_project("deep work").unwrap(), project);
        assert!(service.resolve_project("nope").is_err());
    }

    #[tokio::test]
    async fn writes_trigger_background_sync() {
        let db = Database::open_in_memory().unwrap().into_shared();
        configure(&db, SyncTarget::Notion);
        configure(&db, SyncTarget::Sheets);
        let provider = Arc::new(FakeProvider::default());
        let orchestrator = Arc::new(SyncOrchestrator::new(db.clone(), provider.clone()));
        let worker = SyncWorker::spawn(orchestrator);
        let service = EntryService::new(db.clone(), Some(worker.handle()));

        let project = service
            .create_project(NewProject {
                name: "Deep Work".into(),
                ..Default::default()
            })
            .unwrap();
        let entry = service.create(deep_work_input(&project.id)).unwrap();
        assert_eq!(entry.notion_sync_status, SyncStatus::Pending);
        worker.shutdown().await;

        let synced = service.get(&entry.id).unwrap();
        assert_eq!(synced.notion_sync_status, SyncStatus::Synced);
        assert_eq!(synced.sheets_sync_status, SyncStatus::Synced);
        assert_eq!(provider.notion.record_count(), 1);
        assert_eq!(provider.sheets.record_count(), 1);
    }

    #[tokio::test]
    async fn notion_auto_sync_can_be_disabled() {
        let db = Database::open_in_memory().unwrap().into_shared();
        configure(&db, SyncTarget::Notion);
        db.lock()
            .unwrap()
            .set_setting("notion_auto_sync", &serde_json::json!(false))
            .unwrap();
        let provider = Arc::new(FakeProvider::default());
        let orchestrator = Arc::new(SyncOrchestrator::new(db.clone(), provider.clone()));
        let worker = SyncWorker::spawn(orchestrator);
        let service = EntryService::new(db, Some(worker.handle()));

        let project = service
            .create_project(NewProject {
                name: "Admin".into(),
                ..Default::default()
            })
            .unwrap();
        let entry = service.create(deep_work_input(&project.id)).unwrap();
        worker.shutdown().await;

        assert_eq!(provider.notion.calls(), 0);
        assert_eq!(
            service.get(&entry.id).unwrap().notion_sync_status,
            SyncStatus::Pending
        );
    }

    #[tokio::test]
    async fn delete_removes_remote_records() {
        let db = Database::open_in_memory().unwrap().into_shared();
        configure(&db, SyncTarget::Notion);
        configure(&db, SyncTarget::Sheets);
        let provider = Arc::new(FakeProvider::default());
        let orchestrator = Arc::new(SyncOrchestrator::new(db.clone(), provider.clone()));

        let project = {
            let plain = EntryService::new(db.clone(), None);
            plain
                .create_project(NewProject {
                    name: "Deep Work".into(),
                    ..Default::default()
                })
                .unwrap()
        };
        let entry = EntryService::new(db.clone(), None)
            .create(deep_work_input(&project.id))
            .unwrap();
        orchestrator.sync_entry(SyncTarget::Notion, &entry.id).await.unwrap();
        orchestrator.sync_entry(SyncTarget::Sheets, &entry.id).await.unwrap();

        let worker = SyncWorker::spawn(orchestrator);
        let service = EntryService::new(db, Some(worker.handle()));
        service.delete(&entry.id).unwrap();
        worker.shutdown().await;

        assert_eq!(provider.notion.record_count(), 0);
        assert_eq!(provider.sheets.record_count(), 0);
        assert_eq!(provider.sheets.removed().len(), 1);
    }
}
