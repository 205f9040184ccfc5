//! SQLite-based entry store.
//!
//! Provides persistent storage for:
//! - Projects
//! - Time entries with their project associations and per-target mirror state
//! - Integration settings (JSON-encoded values)
//! - Key-value store for front-end session state

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::{
    EntryFilter, EntrySource, NewEntry, NewProject, Project, ProjectPatch, TimeEntry,
    DEFAULT_PROJECTS,
};
use crate::error::DatabaseError;
use crate::sync::{RemoteLocator, SyncStatus, SyncTarget};

use super::data_dir;
use super::migrations;

/// Connection shared between the entry service and the sync worker.
/// Never hold the guard across an `.await`.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Lock a shared database, mapping a poisoned mutex to [`DatabaseError::Poisoned`].
pub fn lock(db: &SharedDatabase) -> Result<MutexGuard<'_, Database>, DatabaseError> {
    db.lock().map_err(|_| DatabaseError::Poisoned)
}

/// Per-target status tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub synced: u64,
    pub failed: u64,
}

const ENTRY_COLUMNS: &str = "id, duration, date, start_time, end_time, notes, reference_links, tags,
     source, notion_page_id, notion_sync_status, sheets_row_index, sheets_sync_status,
     created_at, updated_at";

/// SQLite database for entries, projects and settings.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/hourglass.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("hourglass.db"))
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Wrap into the shared handle used by the sync layer.
    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    // ── Projects ─────────────────────────────────────────────────────

    pub fn create_project(&self, project: &NewProject) -> Result<Project, rusqlite::Error> {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: project.name.trim().to_string(),
            description: project.description.clone(),
            color: project.color.clone(),
            archived: false,
            // Stored with microsecond precision.
            created_at: Utc::now().trunc_subsecs(6),
        };
        self.conn.execute(
            "INSERT INTO projects (id, name, description, color, archived, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                project.id,
                project.name,
                project.description,
                project.color,
                ts(&project.created_at),
            ],
        )?;
        Ok(project)
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, name, description, color, archived, created_at
                 FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .optional()
    }

    pub fn find_project_by_name(&self, name: &str) -> Result<Option<Project>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, name, description, color, archived, created_at
                 FROM projects WHERE name = ?1 COLLATE NOCASE",
                params![name],
                row_to_project,
            )
            .optional()
    }

    /// List projects in creation order.
    pub fn list_projects(&self, include_archived: bool) -> Result<Vec<Project>, rusqlite::Error> {
        let sql = if include_archived {
            "SELECT id, name, description, color, archived, created_at
             FROM projects ORDER BY created_at, rowid"
        } else {
            "SELECT id, name, description, color, archived, created_at
             FROM projects WHERE archived = 0 ORDER BY created_at, rowid"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let projects = stmt.query_map([], row_to_project)?;
        projects.collect()
    }

    pub fn update_project(
        &self,
        id: &str,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, rusqlite::Error> {
        let Some(mut project) = self.get_project(id)? else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = &patch.description {
            project.description = description.clone();
        }
        if let Some(color) = &patch.color {
            project.color = color.clone();
        }
        self.conn.execute(
            "UPDATE projects SET name = ?1, description = ?2, color = ?3 WHERE id = ?4",
            params![project.name, project.description, project.color, project.id],
        )?;
        Ok(Some(project))
    }

    pub fn set_project_archived(
        &self,
        id: &str,
        archived: bool,
    ) -> Result<Option<Project>, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE projects SET archived = ?1 WHERE id = ?2",
            params![archived as i32, id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_project(id)
    }

    /// Insert the default projects that don't exist yet. Returns how many were added.
    pub fn seed_default_projects(&self) -> Result<usize, rusqlite::Error> {
        let mut added = 0;
        for (name, color) in DEFAULT_PROJECTS {
            if self.find_project_by_name(name)?.is_none() {
                self.create_project(&NewProject {
                    name: (*name).to_string(),
                    description: None,
                    color: Some((*color).to_string()),
                })?;
                added += 1;
            }
        }
        Ok(added)
    }

    // ── Entries ──────────────────────────────────────────────────────

    /// Insert a new entry. Every target starts out `pending`.
    pub fn insert_entry(&self, entry: &NewEntry) -> Result<TimeEntry, rusqlite::Error> {
        let id = Uuid::new_v4().to_string();
        let now = ts(&Utc::now());

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO time_entries (id, duration, date, start_time, end_time, notes,
                 reference_links, tags, source, notion_sync_status, sheets_sync_status,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', 'pending', ?10, ?10)",
            params![
                id,
                duration_to_sql(entry.duration_secs)?,
                entry.date.to_string(),
                entry.start_time.as_ref().map(ts),
                entry.end_time.as_ref().map(ts),
                entry.notes,
                to_json_list(&entry.reference_links),
                to_json_list(&entry.tags),
                entry.source.as_str(),
                now,
            ],
        )?;
        insert_entry_projects(&tx, &id, &entry.project_ids)?;
        tx.commit()?;

        self.get_entry(&id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<TimeEntry>, rusqlite::Error> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM time_entries WHERE id = ?1");
        let entry = self
            .conn
            .query_row(&sql, params![id], row_to_entry)
            .optional()?;
        match entry {
            Some(mut entry) => {
                self.load_entry_projects(&mut entry)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// List entries matching `filter`, newest first.
    pub fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<TimeEntry>, rusqlite::Error> {
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(project_id) = &filter.project_id {
            values.push(project_id.clone());
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM time_entry_projects tep
                         WHERE tep.time_entry_id = time_entries.id AND tep.project_id = ?{})",
                values.len()
            ));
        }
        if let Some(from) = filter.date_from {
            values.push(from.to_string());
            conditions.push(format!("date >= ?{}", values.len()));
        }
        if let Some(to) = filter.date_to {
            values.push(to.to_string());
            conditions.push(format!("date <= ?{}", values.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries {where_clause}
             ORDER BY created_at DESC, rowid DESC"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut entries = stmt
            .query_map(params_from_iter(values.iter()), row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        for entry in &mut entries {
            self.load_entry_projects(entry)?;
        }
        Ok(entries)
    }

    /// Replace an entry's content and reset every target to `pending`.
    /// Remote locators are kept so the next push updates in place.
    pub fn update_entry(
        &self,
        id: &str,
        entry: &NewEntry,
    ) -> Result<Option<TimeEntry>, rusqlite::Error> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE time_entries
             SET duration = ?1, date = ?2, start_time = ?3, end_time = ?4, notes = ?5,
                 reference_links = ?6, tags = ?7, source = ?8,
                 notion_sync_status = 'pending', sheets_sync_status = 'pending',
                 updated_at = ?9
             WHERE id = ?10",
            params![
                duration_to_sql(entry.duration_secs)?,
                entry.date.to_string(),
                entry.start_time.as_ref().map(ts),
                entry.end_time.as_ref().map(ts),
                entry.notes,
                to_json_list(&entry.reference_links),
                to_json_list(&entry.tags),
                entry.source.as_str(),
                ts(&Utc::now()),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        tx.execute(
            "DELETE FROM time_entry_projects WHERE time_entry_id = ?1",
            params![id],
        )?;
        insert_entry_projects(&tx, id, &entry.project_ids)?;
        tx.commit()?;

        self.get_entry(id)
    }

    /// Delete an entry, returning it so callers can clean up its mirrors.
    pub fn delete_entry(&self, id: &str) -> Result<Option<TimeEntry>, rusqlite::Error> {
        let Some(entry) = self.get_entry(id)? else {
            return Ok(None);
        };
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM time_entry_projects WHERE time_entry_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM time_entries WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(Some(entry))
    }

    /// Ids of entries whose status for `target` is `pending` or `failed`, oldest first.
    pub fn entries_needing_sync(&self, target: SyncTarget) -> Result<Vec<String>, rusqlite::Error> {
        let sql = format!(
            "SELECT id FROM time_entries
             WHERE {col} IN ('pending', 'failed')
             ORDER BY created_at, rowid",
            col = target.status_column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;
        ids.collect()
    }

    /// Overwrite the status of one target. Does not touch `updated_at`.
    pub fn set_sync_status(
        &self,
        id: &str,
        target: SyncTarget,
        status: SyncStatus,
    ) -> Result<(), rusqlite::Error> {
        let sql = format!(
            "UPDATE time_entries SET {col} = ?1 WHERE id = ?2",
            col = target.status_column()
        );
        self.conn.execute(&sql, params![status.as_str(), id])?;
        Ok(())
    }

    /// Remember where an entry was mirrored.
    pub fn set_locator(&self, id: &str, locator: &RemoteLocator) -> Result<(), rusqlite::Error> {
        match locator {
            RemoteLocator::NotionPage(page_id) => self.conn.execute(
                "UPDATE time_entries SET notion_page_id = ?1 WHERE id = ?2",
                params![page_id, id],
            )?,
            RemoteLocator::SheetRow(row) => self.conn.execute(
                "UPDATE time_entries SET sheets_row_index = ?1 WHERE id = ?2",
                params![row, id],
            )?,
        };
        Ok(())
    }

    pub fn status_counts(&self, target: SyncTarget) -> Result<StatusCounts, rusqlite::Error> {
        let sql = format!(
            "SELECT {col}, COUNT(*) FROM time_entries GROUP BY {col}",
            col = target.status_column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (status, count) = row?;
            let count = count.max(0) as u64;
            match SyncStatus::from_db(&status) {
                SyncStatus::Pending => counts.pending += count,
                SyncStatus::Synced => counts.synced += count,
                SyncStatus::Failed => counts.failed += count,
            }
        }
        Ok(counts)
    }

    fn load_entry_projects(&self, entry: &mut TimeEntry) -> Result<(), rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.color
             FROM time_entry_projects tep
             JOIN projects p ON p.id = tep.project_id
             WHERE tep.time_entry_id = ?1
             ORDER BY tep.rowid",
        )?;
        let rows = stmt.query_map(params![entry.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        entry.project_ids.clear();
        entry.project_names.clear();
        entry.project_colors.clear();
        for row in rows {
            let (id, name, color) = row?;
            entry.project_ids.push(id);
            entry.project_names.push(name);
            entry.project_colors.push(color);
        }
        Ok(())
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// All settings, decoded from their JSON encoding.
    pub fn settings_all(&self) -> Result<BTreeMap<String, serde_json::Value>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let raw: String = row.get(1)?;
            Ok((key, decode_setting(&raw)))
        })?;
        rows.collect()
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, rusqlite::Error> {
        let raw = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw.as_deref().map(decode_setting))
    }

    /// Store a setting; the value is JSON-encoded.
    pub fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value.to_string()],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool, rusqlite::Error> {
        let changed = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn insert_entry_projects(
    conn: &Connection,
    entry_id: &str,
    project_ids: &[String],
) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO time_entry_projects (time_entry_id, project_id) VALUES (?1, ?2)",
    )?;
    for project_id in project_ids {
        stmt.execute(params![entry_id, project_id])?;
    }
    Ok(())
}

fn row_to_project(row: &rusqlite::Row) -> Result<Project, rusqlite::Error> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        archived: row.get::<_, i32>(4)? != 0,
        created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
    })
}

fn row_to_entry(row: &rusqlite::Row) -> Result<TimeEntry, rusqlite::Error> {
    let date_str: String = row.get(2)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| conversion_error(2, e))?;
    let start_time = row
        .get::<_, Option<String>>(3)?
        .map(|s| parse_ts(3, &s))
        .transpose()?;
    let end_time = row
        .get::<_, Option<String>>(4)?
        .map(|s| parse_ts(4, &s))
        .transpose()?;

    Ok(TimeEntry {
        id: row.get(0)?,
        project_ids: Vec::new(), // Loaded separately
        project_names: Vec::new(),
        project_colors: Vec::new(),
        duration_secs: u64::try_from(row.get::<_, i64>(1)?).map_err(|e| conversion_error(1, e))?,
        date,
        start_time,
        end_time,
        notes: row.get(5)?,
        reference_links: parse_json_list(6, &row.get::<_, String>(6)?)?,
        tags: parse_json_list(7, &row.get::<_, String>(7)?)?,
        source: EntrySource::from_db(&row.get::<_, String>(8)?),
        notion_page_id: row.get(9)?,
        notion_sync_status: SyncStatus::from_db(&row.get::<_, String>(10)?),
        sheets_row_index: row.get(11)?,
        sheets_sync_status: SyncStatus::from_db(&row.get::<_, String>(12)?),
        created_at: parse_ts(13, &row.get::<_, String>(13)?)?,
        updated_at: parse_ts(14, &row.get::<_, String>(14)?)?,
    })
}

fn duration_to_sql(secs: u64) -> Result<i64, rusqlite::Error> {
    i64::try_from(secs).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn to_json_list(items: &[String]) -> String {
    serde_json::Value::from(items.to_vec()).to_string()
}

fn parse_json_list(idx: usize, s: &str) -> Result<Vec<String>, rusqlite::Error> {
    serde_json::from_str(s).map_err(|e| conversion_error(idx, e))
}

/// Values written by other tools may not be JSON; keep them as plain strings.
fn decode_setting(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
