//! Notion database helpers.

use clap::Subcommand;
use hourglass_core::storage::settings::NOTION_TOKEN;
use hourglass_core::{ConfigError, HttpMirrorProvider, SyncTarget};

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum NotionAction {
    /// List databases shared with the integration token
    Databases,
    /// Add the properties entries need to the configured database
    Setup,
}

pub async fn run(action: NotionAction) -> CmdResult {
    let session = Session::open()?;
    let result = match action {
        NotionAction::Databases => databases(&session).await,
        NotionAction::Setup => session
            .orchestrator
            .provision(SyncTarget::Notion)
            .await
            .map(|()| eprintln!("Notion database is ready"))
            .map_err(Into::into),
    };
    session.finish().await;
    result
}

/// Only needs a token, so it works before a database id is chosen.
async fn databases(session: &Session) -> CmdResult {
    let token = session
        .db()?
        .get_setting(NOTION_TOKEN)?
        .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingKey(NOTION_TOKEN.to_string()))?;

    let databases = HttpMirrorProvider::new()
        .notion_client(&token)
        .list_databases()
        .await?;
    print_json(&databases)
}
