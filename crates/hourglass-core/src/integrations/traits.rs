use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::entry::TimeEntry;
use crate::storage::{ServiceAccountKey, Settings};
use crate::sync::{RemoteLocator, SyncError, SyncTarget};

use super::google_auth::{ServiceAccountAuth, TokenSource};
use super::notion::{NotionClient, NotionMirror};
use super::sheets::{SheetsClient, SheetsMirror};

/// A configured downstream mirror.
///
/// Implementations hold everything needed to talk to the remote side; they
/// never touch the local store. The orchestrator persists whatever locator
/// `upsert` returns.
#[async_trait]
pub trait MirrorTarget: Send + Sync {
    fn target(&self) -> SyncTarget;

    /// Create the remote record, or update it in place when the entry
    /// already carries a locator for this target.
    async fn upsert(&self, entry: &TimeEntry) -> Result<RemoteLocator, SyncError>;

    /// Archive (Notion) or clear (Sheets) the record at `locator`.
    async fn remove(&self, locator: &RemoteLocator) -> Result<(), SyncError>;

    /// Make sure the remote container has the fields/headers entries need.
    async fn provision(&self) -> Result<(), SyncError>;
}

/// Builds mirrors from the current settings.
pub trait MirrorProvider: Send + Sync {
    /// `None` when `target` is not configured.
    fn mirror(&self, target: SyncTarget, settings: &Settings) -> Option<Arc<dyn MirrorTarget>>;
}

/// Provider backed by the real Notion and Google Sheets APIs.
pub struct HttpMirrorProvider {
    http: reqwest::Client,
    google_auth: Mutex<Option<Arc<ServiceAccountAuth>>>,
}

impl HttpMirrorProvider {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            google_auth: Mutex::new(None),
        }
    }

    /// A bare Notion client, for operations that only need the token.
    pub fn notion_client(&self, token: &str) -> NotionClient {
        NotionClient::new(self.http.clone(), token)
    }

    /// Reuse the cached authenticator while the credential is unchanged so
    /// access tokens survive across sync runs.
    fn google_auth(&self, key: &ServiceAccountKey) -> Arc<ServiceAccountAuth> {
        let mut slot = match self.google_auth.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slot.as_ref() {
            Some(auth) if auth.key() == key => Arc::clone(auth),
            _ => {
                let auth = Arc::new(ServiceAccountAuth::new(self.http.clone(), key.clone()));
                *slot = Some(Arc::clone(&auth));
                auth
            }
        }
    }
}

impl Default for HttpMirrorProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorProvider for HttpMirrorProvider {
    fn mirror(&self, target: SyncTarget, settings: &Settings) -> Option<Arc<dyn MirrorTarget>> {
        match target {
            SyncTarget::Notion => {
                let notion = settings.notion.as_ref()?;
                let client = self.notion_client(&notion.token);
                Some(Arc::new(NotionMirror::new(client, notion.database_id.clone())))
            }
            SyncTarget::Sheets => {
                let sheets = settings.sheets.as_ref()?;
                let auth = self.google_auth(&sheets.service_account);
                let client = SheetsClient::new(
                    self.http.clone(),
                    TokenSource::ServiceAccount(auth),
                    sheets.spreadsheet_id.clone(),
                );
                Some(Arc::new(SheetsMirror::new(client)))
            }
        }
    }
}
