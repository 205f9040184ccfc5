pub mod database;
pub mod migrations;
pub mod settings;

pub use database::{Database, SharedDatabase, StatusCounts};
pub use settings::{NotionSettings, ServiceAccountKey, Settings, SheetsSettings};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `HOURGLASS_DATA_DIR` wins when set; otherwise `~/.config/hourglass[-dev]/`
/// based on `HOURGLASS_ENV` (set `HOURGLASS_ENV=dev` for the development
/// directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("HOURGLASS_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("HOURGLASS_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("hourglass-dev")
            } else {
                base_dir.join("hourglass")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
