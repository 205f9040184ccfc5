//! Explicit sync commands.

use clap::Subcommand;
use hourglass_core::{BulkSyncReport, ConfigError, SyncTarget};
use serde_json::{json, Map, Value};

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Push pending and failed entries (or one entry) to Notion
    Notion {
        /// Sync only this entry
        #[arg(long)]
        entry: Option<String>,
    },
    /// Push pending and failed entries (or one entry) to Google Sheets
    Sheets {
        /// Sync only this entry
        #[arg(long)]
        entry: Option<String>,
    },
    /// Push to every configured target
    All,
    /// Show per-target status counts
    Status,
}

pub async fn run(action: SyncAction) -> CmdResult {
    let session = Session::open()?;
    let result = dispatch(&session, action).await;
    session.finish().await;
    result
}

async fn dispatch(session: &Session, action: SyncAction) -> CmdResult {
    match action {
        SyncAction::Notion { entry } => sync_target(session, SyncTarget::Notion, entry).await,
        SyncAction::Sheets { entry } => sync_target(session, SyncTarget::Sheets, entry).await,
        SyncAction::All => {
            let mut out = Map::new();
            for target in SyncTarget::ALL {
                if !session.orchestrator.is_configured(target)? {
                    out.insert(target.as_str().to_string(), json!("not configured"));
                    continue;
                }
                let report = session.orchestrator.sync_all(target).await?;
                out.insert(target.as_str().to_string(), report_json(&report));
            }
            print_json(&Value::Object(out))
        }
        SyncAction::Status => {
            let mut out = Map::new();
            for target in SyncTarget::ALL {
                let configured = session.orchestrator.is_configured(target)?;
                let counts = session.db()?.status_counts(target)?;
                out.insert(
                    target.as_str().to_string(),
                    json!({ "configured": configured, "counts": counts }),
                );
            }
            print_json(&Value::Object(out))
        }
    }
}

async fn sync_target(session: &Session, target: SyncTarget, entry: Option<String>) -> CmdResult {
    if !session.orchestrator.is_configured(target)? {
        return Err(ConfigError::NotConfigured(target.display_name().to_string()).into());
    }

    match entry {
        Some(id) => {
            // Surface a missing id instead of a silent `false`.
            session.service.get(&id)?;
            let synced = session.orchestrator.sync_entry(target, &id).await?;
            let status = session.service.get(&id)?.sync_status(target);
            print_json(&json!({ "entry_id": id, "synced": synced, "status": status }))?;
            if !synced {
                return Err(format!("sync to {} failed; see log output", target.display_name()).into());
            }
            Ok(())
        }
        None => {
            let report = session.orchestrator.sync_all(target).await?;
            print_json(&report_json(&report))
        }
    }
}

fn report_json(report: &BulkSyncReport) -> Value {
    json!({ "synced": report.synced, "failed": report.failed })
}
