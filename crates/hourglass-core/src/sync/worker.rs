//! Background processing of sync jobs triggered by entry writes.
//!
//! Jobs are queued on an unbounded channel and handled one at a time by a
//! single tokio task, so a mutation returns as soon as the local write
//! commits.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::orchestrator::SyncOrchestrator;
use super::types::{RemoteLocator, SyncTarget};

/// A unit of fire-and-forget sync work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJob {
    /// Create or update the entry's mirror record.
    Upsert { target: SyncTarget, entry_id: String },
    /// Archive/clear the record of a deleted entry.
    Remove { locator: RemoteLocator },
}

enum Message {
    Job(SyncJob),
    Shutdown,
}

/// Cloneable submission side of a [`SyncWorker`].
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl SyncHandle {
    /// Queue a job. Returns `false` if the worker has already stopped.
    pub fn submit(&self, job: SyncJob) -> bool {
        match self.tx.send(Message::Job(job)) {
            Ok(()) => true,
            Err(mpsc::error::SendError(Message::Job(job))) => {
                tracing::debug!(?job, "sync worker stopped, dropping job");
                false
            }
            Err(_) => false,
        }
    }
}

pub struct SyncWorker {
    handle: SyncHandle,
    task: JoinHandle<()>,
}

impl SyncWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(orchestrator: Arc<SyncOrchestrator>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(orchestrator, rx));
        Self {
            handle: SyncHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Finish every job submitted before this call, then stop.
    pub async fn shutdown(self) {
        if self.handle.tx.send(Message::Shutdown).is_err() {
            tracing::debug!("sync worker already stopped");
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "sync worker task panicked");
        }
    }
}

async fn run(orchestrator: Arc<SyncOrchestrator>, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Job(job) => process(&orchestrator, job).await,
            Message::Shutdown => break,
        }
    }
    tracing::debug!("sync worker stopped");
}

async fn process(orchestrator: &SyncOrchestrator, job: SyncJob) {
    let outcome = match &job {
        SyncJob::Upsert { target, entry_id } => orchestrator
            .sync_entry(*target, entry_id)
            .await
            .map(|_| ()),
        SyncJob::Remove { locator } => orchestrator.remove_mirror(locator).await.map(|_| ()),
    };
    if let Err(e) = outcome {
        tracing::error!(?job, error = %e, "sync job failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{configure, seeded_db, FakeProvider};
    use crate::sync::{SyncStatus, SyncTarget};

    #[tokio::test]
    async fn shutdown_drains_submitted_jobs() {
        let (db, entry_ids) = seeded_db(3);
        configure(&db, SyncTarget::Notion);
        let provider = Arc::new(FakeProvider::default());
        let orchestrator = Arc::new(SyncOrchestrator::new(db.clone(), provider.clone()));

        let worker = SyncWorker::spawn(orchestrator);
        let handle = worker.handle();
        for id in &entry_ids {
            assert!(handle.submit(SyncJob::Upsert {
                target: SyncTarget::Notion,
                entry_id: id.clone(),
            }));
        }
        worker.shutdown().await;

        assert_eq!(provider.notion.record_count(), 3);
        let db = db.lock().unwrap();
        for id in &entry_ids {
            let entry = db.get_entry(id).unwrap().unwrap();
            assert_eq!(entry.notion_sync_status, SyncStatus::Synced);
        }
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let (db, entry_ids) = seeded_db(1);
        let orchestrator = Arc::new(SyncOrchestrator::new(db, Arc::new(FakeProvider::default())));
        let worker = SyncWorker::spawn(orchestrator);
        let handle = worker.handle();
        worker.shutdown().await;

        assert!(!handle.submit(SyncJob::Upsert {
            target: SyncTarget::Sheets,
            entry_id: entry_ids[0].clone(),
        }));
    }

    #[tokio::test]
    async fn remove_job_reaches_mirror() {
        let (db, _) = seeded_db(0);
        configure(&db, SyncTarget::Sheets);
        let provider = Arc::new(FakeProvider::default());
        let orchestrator = Arc::new(SyncOrchestrator::new(db, provider.clone()));
        let worker = SyncWorker::spawn(orchestrator);

        worker.handle().submit(SyncJob::Remove {
            locator: RemoteLocator::SheetRow(4),
        });
        worker.shutdown().await;

        assert_eq!(provider.sheets.removed(), vec![RemoteLocator::SheetRow(4)]);
    }
}
