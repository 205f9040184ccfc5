//! Typed view over the integration settings stored in the `settings` table.
//!
//! Settings are re-read on every sync operation so edits take effect without
//! restarting anything.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::database::Database;

pub const NOTION_TOKEN: &str = "notion_token";
pub const NOTION_DATABASE_ID: &str = "notion_database_id";
pub const NOTION_AUTO_SYNC: &str = "notion_auto_sync";
pub const GOOGLE_SERVICE_ACCOUNT: &str = "google_service_account";
pub const GOOGLE_SPREADSHEET_ID: &str = "google_spreadsheet_id";

/// Keys understood by [`Settings::load`].
pub const KNOWN_KEYS: &[&str] = &[
    NOTION_TOKEN,
    NOTION_DATABASE_ID,
    NOTION_AUTO_SYNC,
    GOOGLE_SERVICE_ACCOUNT,
    GOOGLE_SPREADSHEET_ID,
];

/// Keys whose values are credentials and must not be echoed back in full.
pub const SECRET_KEYS: &[&str] = &[NOTION_TOKEN, GOOGLE_SERVICE_ACCOUNT];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub notion: Option<NotionSettings>,
    pub sheets: Option<SheetsSettings>,
}

#[derive(Clone, PartialEq)]
pub struct NotionSettings {
    pub token: String,
    pub database_id: String,
    pub auto_sync: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetsSettings {
    pub service_account: ServiceAccountKey,
    pub spreadsheet_id: String,
}

/// The subset of a Google service-account JSON key we need.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for NotionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionSettings")
            .field("token", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("auto_sync", &self.auto_sync)
            .finish()
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl Settings {
    /// Load settings from the store.
    pub fn load(db: &Database) -> Result<Self, rusqlite::Error> {
        Ok(Self::from_map(&db.settings_all()?))
    }

    /// Build from raw key/value pairs. Missing, null or empty values mean the
    /// integration is not configured; malformed values are logged and ignored.
    pub fn from_map(map: &BTreeMap<String, Value>) -> Self {
        let notion = match (
            string_value(map, NOTION_TOKEN),
            string_value(map, NOTION_DATABASE_ID),
        ) {
            (Some(token), Some(database_id)) => Some(NotionSettings {
                token,
                database_id,
                auto_sync: bool_value(map, NOTION_AUTO_SYNC).unwrap_or(true),
            }),
            _ => None,
        };

        let sheets = match (
            service_account(map),
            string_value(map, GOOGLE_SPREADSHEET_ID),
        ) {
            (Some(service_account), Some(spreadsheet_id)) => Some(SheetsSettings {
                service_account,
                spreadsheet_id,
            }),
            _ => None,
        };

        Self { notion, sheets }
    }

    /// Whether entry writes should push to Notion without being asked.
    pub fn notion_auto_sync(&self) -> bool {
        self.notion.as_ref().is_some_and(|n| n.auto_sync)
    }
}

fn string_value(map: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::String(_) | Value::Null => None,
        other => {
            tracing::warn!(key, value = %other, "ignoring non-string setting");
            None
        }
    }
}

fn bool_value(map: &BTreeMap<String, Value>, key: &str) -> Option<bool> {
    match map.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// The credential may be stored as an object or as a JSON-encoded string.
fn service_account(map: &BTreeMap<String, Value>) -> Option<ServiceAccountKey> {
    let parsed = match map.get(GOOGLE_SERVICE_ACCOUNT)? {
        value @ Value::Object(_) => serde_json::from_value::<ServiceAccountKey>(value.clone()),
        Value::String(s) if !s.trim().is_empty() => serde_json::from_str(s),
        _ => return None,
    };
    match parsed {
        Ok(key) if !key.client_email.is_empty() && !key.private_key.is_empty() => Some(key),
        Ok(_) => {
            tracing::warn!("service account credential is missing client_email or private_key");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed service account credential");
            None
        }
    }
}
