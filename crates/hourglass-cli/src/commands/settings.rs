//! Integration settings commands.

use std::path::PathBuf;

use clap::Subcommand;
use hourglass_core::storage::settings::{KNOWN_KEYS, SECRET_KEYS};
use hourglass_core::Database;
use serde_json::{Map, Value};

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show every stored setting (credentials masked)
    List,
    /// Show one setting (credentials masked)
    Get { key: String },
    /// Store a setting. Values that parse as JSON are stored as JSON,
    /// anything else as a string.
    Set {
        key: String,
        /// Value to store
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        value: Option<String>,
        /// Read the value from a file (e.g. a service account key)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove a setting
    Unset { key: String },
}

pub fn run(action: SettingsAction) -> CmdResult {
    let db = Database::open()?;

    match action {
        SettingsAction::List => {
            let masked: Map<String, Value> = db
                .settings_all()?
                .into_iter()
                .map(|(key, value)| {
                    let shown = display_value(&key, value);
                    (key, shown)
                })
                .collect();
            print_json(&masked)?;
        }
        SettingsAction::Get { key } => match db.get_setting(&key)? {
            Some(value) => print_json(&display_value(&key, value))?,
            None => return Err(format!("setting '{key}' is not set").into()),
        },
        SettingsAction::Set { key, value, file } => {
            warn_if_unknown(&key);
            let raw = match (value, file) {
                (_, Some(path)) => std::fs::read_to_string(&path)?,
                (Some(value), None) => value,
                (None, None) => return Err("give a value or --file".into()),
            };
            db.set_setting(&key, &parse_value(&raw))?;
            eprintln!("Setting '{key}' saved");
        }
        SettingsAction::Unset { key } => {
            if db.delete_setting(&key)? {
                eprintln!("Setting '{key}' removed");
            } else {
                eprintln!("Setting '{key}' was not set");
            }
        }
    }
    Ok(())
}

fn warn_if_unknown(key: &str) {
    if !KNOWN_KEYS.contains(&key) {
        eprintln!(
            "warning: '{key}' is not a recognised setting (known: {})",
            KNOWN_KEYS.join(", ")
        );
    }
}

/// JSON if it parses, otherwise the trimmed text as a string.
fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn display_value(key: &str, value: Value) -> Value {
    if SECRET_KEYS.contains(&key) {
        mask(value)
    } else {
        value
    }
}

/// Hide credential material, keeping just enough to recognise which
/// credential is stored.
fn mask(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let tail: String = s
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            if s.chars().count() > 8 {
                Value::String(format!("********{tail}"))
            } else {
                Value::String("********".to_string())
            }
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| match k.as_str() {
                    "client_email" | "project_id" | "type" | "token_uri" => (k, v),
                    _ => (k, Value::String("********".to_string())),
                })
                .collect(),
        ),
        Value::Null => Value::Null,
        _ => Value::String("********".to_string()),
    }
}
