//! Drives entries from the local store to their mirrors.

use std::sync::Arc;

use crate::error::{ConfigError, Result};
use crate::integrations::{HttpMirrorProvider, MirrorProvider, MirrorTarget};
use crate::storage::database::lock;
use crate::storage::{SharedDatabase, Settings};

use super::types::{BulkSyncReport, RemoteLocator, SyncStatus, SyncTarget};

/// Pushes entries to whichever mirrors are configured.
///
/// Remote failures are recorded as [`SyncStatus::Failed`] and logged; only
/// local store errors are returned to the caller.
pub struct SyncOrchestrator {
    db: SharedDatabase,
    provider: Arc<dyn MirrorProvider>,
}

impl SyncOrchestrator {
    pub fn new(db: SharedDatabase, provider: Arc<dyn MirrorProvider>) -> Self {
        Self { db, provider }
    }

    /// Orchestrator talking to the real Notion and Google Sheets APIs.
    pub fn with_http(db: SharedDatabase) -> Self {
        Self::new(db, Arc::new(HttpMirrorProvider::new()))
    }

    pub fn db(&self) -> &SharedDatabase {
        &self.db
    }

    /// Settings as currently stored.
    pub fn settings(&self) -> Result<Settings> {
        let db = lock(&self.db)?;
        Ok(Settings::load(&db)?)
    }

    /// The mirror for `target`, or `None` when it isn't configured.
    pub fn mirror(&self, target: SyncTarget) -> Result<Option<Arc<dyn MirrorTarget>>> {
        let settings = self.settings()?;
        Ok(self.provider.mirror(target, &settings))
    }

    pub fn is_configured(&self, target: SyncTarget) -> Result<bool> {
        Ok(self.mirror(target)?.is_some())
    }

    /// Push one entry. Returns `false` when the target is not configured,
    /// the entry no longer exists, or the remote call failed.
    pub async fn sync_entry(&self, target: SyncTarget, entry_id: &str) -> Result<bool> {
        let Some(mirror) = self.mirror(target)? else {
            tracing::debug!(%target, entry_id, "target not configured, skipping sync");
            return Ok(false);
        };
        self.push(mirror.as_ref(), entry_id).await
    }

    /// Push every entry whose status for `target` is pending or failed, one
    /// at a time.
    pub async fn sync_all(&self, target: SyncTarget) -> Result<BulkSyncReport> {
        let Some(mirror) = self.mirror(target)? else {
            tracing::debug!(%target, "target not configured, skipping bulk sync");
            return Ok(BulkSyncReport::default());
        };

        let ids = lock(&self.db)?.entries_needing_sync(target)?;
        tracing::info!(%target, count = ids.len(), "bulk sync started");

        let mut report = BulkSyncReport::default();
        for id in &ids {
            if self.push(mirror.as_ref(), id).await? {
                report.synced += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(%target, synced = report.synced, failed = report.failed, "bulk sync finished");
        Ok(report)
    }

    /// Archive or clear a deleted entry's remote record. The outcome is only
    /// logged; returns whether the remote accepted it.
    pub async fn remove_mirror(&self, locator: &RemoteLocator) -> Result<bool> {
        let target = locator.target();
        let Some(mirror) = self.mirror(target)? else {
            tracing::debug!(%target, "target not configured, leaving remote record");
            return Ok(false);
        };

        match mirror.remove(locator).await {
            Ok(()) => {
                tracing::info!(%target, ?locator, "removed mirror record");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(%target, ?locator, error = %e, "failed to remove mirror record");
                Ok(false)
            }
        }
    }

    /// Prepare the remote container (Notion properties, sheet header).
    pub async fn provision(&self, target: SyncTarget) -> Result<()> {
        let mirror = self
            .mirror(target)?
            .ok_or_else(|| ConfigError::NotConfigured(target.display_name().to_string()))?;
        mirror.provision().await?;
        Ok(())
    }

    async fn push(&self, mirror: &dyn MirrorTarget, entry_id: &str) -> Result<bool> {
        let target = mirror.target();
        let entry = lock(&self.db)?.get_entry(entry_id)?;
        let Some(entry) = entry else {
            tracing::debug!(%target, entry_id, "entry vanished before sync");
            return Ok(false);
        };

        match mirror.upsert(&entry).await {
            Ok(locator) => {
                let db = lock(&self.db)?;
                db.set_locator(entry_id, &locator)?;
                db.set_sync_status(entry_id, target, SyncStatus::Synced)?;
                tracing::info!(%target, entry_id, ?locator, "entry synced");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(%target, entry_id, error = %e, "entry sync failed");
                lock(&self.db)?.set_sync_status(entry_id, target, SyncStatus::Failed)?;
                Ok(false)
            }
        }
    }
}
