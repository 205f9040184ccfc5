pub mod entry;
pub mod notion;
pub mod project;
pub mod settings;
pub mod sheets;
pub mod sync;
pub mod timer;

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use hourglass_core::storage::database::lock;
use hourglass_core::{Database, EntryService, SyncOrchestrator, SyncWorker};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// An opened store plus the background worker that pushes writes to the
/// configured mirrors. Call [`Session::finish`] before exiting so queued
/// pushes complete.
pub struct Session {
    pub service: EntryService,
    pub orchestrator: Arc<SyncOrchestrator>,
    worker: SyncWorker,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open()?.into_shared();
        let orchestrator = Arc::new(SyncOrchestrator::with_http(db.clone()));
        let worker = SyncWorker::spawn(orchestrator.clone());
        let service = EntryService::new(db, Some(worker.handle()));
        Ok(Self {
            service,
            orchestrator,
            worker,
        })
    }

    pub fn db(&self) -> Result<std::sync::MutexGuard<'_, Database>, Box<dyn std::error::Error>> {
        Ok(lock(self.service.db())?)
    }

    pub async fn finish(self) {
        self.worker.shutdown().await;
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve each `--project` value (id or name) to a project id.
pub fn resolve_projects(
    service: &EntryService,
    projects: &[String],
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    projects
        .iter()
        .map(|p| Ok(service.resolve_project(p)?.id))
        .collect()
}

/// `YYYY-MM-DD`, `today` or `yesterday`.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match s.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => today
            .pred_opt()
            .ok_or_else(|| "date out of range".to_string()),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{s}' (expected YYYY-MM-DD)")),
    }
}

/// Parse a duration into whole seconds.
///
/// Accepts `HH:MM:SS`, `HH:MM`, unit forms like `1h30m`, `90m` or `45s`,
/// and a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let invalid = || format!("invalid duration '{s}' (try 1h30m, 01:30:00 or 5400)");
    if s.is_empty() {
        return Err(invalid());
    }

    if s.contains(':') {
        let parts = s
            .split(':')
            .map(|p| p.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        let (h, m, sec) = match parts.as_slice() {
            [h, m] if *m < 60 => (*h, *m, 0),
            [h, m, sec] if *m < 60 && *sec < 60 => (*h, *m, *sec),
            _ => return Err(invalid()),
        };
        return h
            .checked_mul(3600)
            .and_then(|secs| secs.checked_add(m * 60 + sec))
            .ok_or_else(invalid);
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for c in s.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'h' | 'm' | 's' if !digits.is_empty() => {
                let n: u64 = digits.parse().map_err(|_| invalid())?;
                let unit = match c {
                    'h' => 3600,
                    'm' => 60,
                    _ => 1,
                };
                total = n
                    .checked_mul(unit)
                    .and_then(|secs| total.checked_add(secs))
                    .ok_or_else(invalid)?;
                digits.clear();
            }
            _ => return Err(invalid()),
        }
    }
    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

/// An RFC 3339 timestamp, or a local `HH:MM` wall-clock time on `date`.
pub fn parse_time_on(date: NaiveDate, s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
        return Ok(dt.with_timezone(&Utc));
    }
    let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| format!("invalid time '{s}' (expected HH:MM or RFC 3339)"))?;
    Local
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("'{s}' on {date} is not a single local time"))
}
