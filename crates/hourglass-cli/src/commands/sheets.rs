use clap::Subcommand;
use hourglass_core::SyncTarget;

use super::{CmdResult, Session};

#[derive(Subcommand)]
pub enum SheetsAction {
    /// Write the header row if the sheet doesn't have one
    Setup,
}

pub async fn run(action: SheetsAction) -> CmdResult {
    let session = Session::open()?;
    let result = match action {
        SheetsAction::Setup => session.orchestrator.provision(SyncTarget::Sheets).await,
    };
    session.finish().await;
    result?;
    eprintln!("Spreadsheet header is ready");
    Ok(())
}
