use async_trait::async_trait;
use chrono::{Local, TimeZone};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};

use super::google_auth::TokenSource;
use super::traits::MirrorTarget;
use super::{duration_hours, duration_minutes};
use crate::entry::TimeEntry;
use crate::sync::{RemoteLocator, SyncError, SyncTarget};

const SHEETS_API: &str = "https://sheets.googleapis.com";
const SHEET: &str = "Sheet1";

/// Column headers of the mirror sheet (columns A..K).
pub const SHEET_HEADERS: [&str; 11] = [
    "Entry ID",
    "Date",
    "Start Time",
    "End Time",
    "Project(s)",
    "Duration (min)",
    "Duration (hrs)",
    "Notes",
    "Reference Links",
    "Tags",
    "Source",
];

/// Row values for an entry, with times in the local zone.
pub fn entry_to_row(entry: &TimeEntry) -> Vec<String> {
    entry_to_row_in(entry, &Local)
}

/// Row values with start/end rendered as `HH:MM` in `tz`.
pub fn entry_to_row_in<Tz>(entry: &TimeEntry, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let clock = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.with_timezone(tz).format("%H:%M").to_string())
            .unwrap_or_default()
    };

    vec![
        entry.id.clone(),
        entry.date.to_string(),
        clock(entry.start_time),
        clock(entry.end_time),
        entry.project_names.join(", "),
        duration_minutes(entry.duration_secs).to_string(),
        duration_hours(entry.duration_secs).to_string(),
        entry.notes.clone().unwrap_or_default(),
        entry.reference_links.join(", "),
        entry.tags.join(", "),
        entry.source.as_str().to_string(),
    ]
}

/// `Sheet1!A{row}:K{row}`
pub fn row_range(row: u32) -> String {
    format!("{SHEET}!A{row}:K{row}")
}

/// Row number from an append response's `updatedRange` (e.g. `Sheet1!A12:K12`).
pub fn row_from_updated_range(range: &str) -> Option<u32> {
    let (_, cells) = range.rsplit_once('!')?;
    let (first, _) = cells.split_once(':')?;
    first.strip_prefix('A')?.parse().ok()
}

/// Thin client over the Sheets v4 values API for one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    token: TokenSource,
    spreadsheet_id: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(http: Client, token: TokenSource, spreadsheet_id: String) -> Self {
        Self {
            http,
            token,
            spreadsheet_id,
            base_url: SHEETS_API.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request(
        &self,
        method: Method,
        range: &str,
        suffix: &str,
    ) -> Result<RequestBuilder, SyncError> {
        let token = self.token.token().await?;
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range),
            suffix
        );
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, SyncError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            return Err(SyncError::Api {
                service: "Google Sheets",
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    /// Append a row after the last non-empty one; returns its 1-based index.
    pub async fn append_row(&self, row: &[String]) -> Result<u32, SyncError> {
        let range = format!("{SHEET}!A:K");
        let req = self
            .request(Method::POST, &range, ":append")
            .await?
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [row] }));
        let resp = self.send(req).await?;

        let updated = resp["updates"]["updatedRange"].as_str().ok_or_else(|| {
            SyncError::UnexpectedResponse("append response has no updatedRange".into())
        })?;
        row_from_updated_range(updated).ok_or_else(|| {
            SyncError::UnexpectedResponse(format!("cannot parse row from range '{updated}'"))
        })
    }

    /// Overwrite `range` with `rows`.
    pub async fn update_range(&self, range: &str, rows: &[Vec<String>]) -> Result<(), SyncError> {
        let req = self
            .request(Method::PUT, range, "")
            .await?
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "values": rows }));
        self.send(req).await?;
        Ok(())
    }

    pub async fn update_row(&self, row_index: u32, row: Vec<String>) -> Result<(), SyncError> {
        self.update_range(&row_range(row_index), &[row]).await
    }

    /// Blank out a row without deleting it, so later rows keep their index.
    pub async fn clear_row(&self, row_index: u32) -> Result<(), SyncError> {
        let req = self
            .request(Method::POST, &row_range(row_index), ":clear")
            .await?
            .json(&json!({}));
        self.send(req).await?;
        Ok(())
    }

    /// Values of the first row; empty when the sheet has no header yet.
    pub async fn read_header(&self) -> Result<Vec<String>, SyncError> {
        let req = self.request(Method::GET, &row_range(1), "").await?;
        let resp = self.send(req).await?;
        Ok(resp["values"][0]
            .as_array()
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| c.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Mirrors entries as rows of `Sheet1`.
pub struct SheetsMirror {
    client: SheetsClient,
}

impl SheetsMirror {
    pub fn new(client: SheetsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MirrorTarget for SheetsMirror {
    fn target(&self) -> SyncTarget {
        SyncTarget::Sheets
    }

    async fn upsert(&self, entry: &TimeEntry) -> Result<RemoteLocator, SyncError> {
        let row = entry_to_row(entry);
        match entry.sheets_row_index {
            Some(index) => {
                self.client.update_row(index, row).await?;
                Ok(RemoteLocator::SheetRow(index))
            }
            None => {
                let index = self.client.append_row(&row).await?;
                Ok(RemoteLocator::SheetRow(index))
            }
        }
    }

    async fn remove(&self, locator: &RemoteLocator) -> Result<(), SyncError> {
        match locator {
            RemoteLocator::SheetRow(index) => self.client.clear_row(*index).await,
            other => Err(SyncError::WrongLocator(other.clone())),
        }
    }

    async fn provision(&self) -> Result<(), SyncError> {
        if !self.client.read_header().await?.is_empty() {
            tracing::info!("sheet header already present");
            return Ok(());
        }
        let headers = SHEET_HEADERS.iter().map(|h| h.to_string()).collect();
        self.client.update_row(1, headers).await
    }
}
