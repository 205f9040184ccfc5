use chrono::Local;
use clap::Subcommand;
use hourglass_core::{Database, Event, NewEntry, TimerEngine};
use serde_json::json;

use super::{print_json, resolve_projects, CmdResult, Session};

/// kv key holding the in-progress timer between invocations.
const SESSION_KEY: &str = "timer_session";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the timer
    Start,
    /// Pause a running timer
    Pause,
    /// Resume a paused timer
    Resume,
    /// Print current timer state as JSON
    Status,
    /// Stop the timer and record the elapsed time as an entry
    Stop {
        /// Project id or name (repeatable)
        #[arg(long = "project", short = 'p', required = true)]
        projects: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Reference link (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Discard the running timer without recording anything
    Reset,
}

fn load_engine(db: &Database) -> TimerEngine {
    match db.kv_get(SESSION_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable timer session");
            TimerEngine::new()
        }),
        Ok(None) => TimerEngine::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read timer session");
            TimerEngine::new()
        }
    }
}

fn save_engine(db: &Database, engine: &TimerEngine) -> CmdResult {
    let json = serde_json::to_string(engine)?;
    db.kv_set(SESSION_KEY, &json)?;
    Ok(())
}

pub async fn run(action: TimerAction) -> CmdResult {
    match action {
        TimerAction::Start => control(TimerEngine::start),
        TimerAction::Pause => control(TimerEngine::pause),
        TimerAction::Resume => control(TimerEngine::resume),
        TimerAction::Status => {
            let db = Database::open()?;
            print_json(&load_engine(&db).snapshot())
        }
        TimerAction::Reset => {
            let db = Database::open()?;
            let event = load_engine(&db).reset();
            db.kv_delete(SESSION_KEY)?;
            print_json(&event)
        }
        TimerAction::Stop {
            projects,
            notes,
            links,
            tags,
        } => stop(projects, notes, links, tags).await,
    }
}

/// Apply a state transition. A rejected transition prints the unchanged
/// state instead of an event.
fn control(command: fn(&mut TimerEngine) -> Option<Event>) -> CmdResult {
    let db = Database::open()?;
    let mut engine = load_engine(&db);

    match command(&mut engine) {
        Some(event) => {
            save_engine(&db, &engine)?;
            print_json(&event)
        }
        None => print_json(&engine.snapshot()),
    }
}

async fn stop(
    projects: Vec<String>,
    notes: Option<String>,
    links: Vec<String>,
    tags: Vec<String>,
) -> CmdResult {
    let session = Session::open()?;
    let project_ids = resolve_projects(&session.service, &projects)?;

    let mut engine = load_engine(&*session.db()?);
    let Some(event) = engine.stop() else {
        eprintln!("Timer is not running; nothing recorded.");
        print_json(&engine.snapshot())?;
        session.finish().await;
        return Ok(());
    };
    let Event::TimerStopped { duration_secs, at } = event.clone() else {
        return Err("timer stop produced an unexpected event".into());
    };

    let input = NewEntry {
        notes,
        reference_links: links,
        tags,
        ..NewEntry::from_timer(
            project_ids,
            duration_secs,
            at,
            at.with_timezone(&Local).date_naive(),
        )
    };
    // The stored session is only cleared once the entry is safely written.
    let entry = session.service.create(input)?;
    session.db()?.kv_delete(SESSION_KEY)?;

    eprintln!("Entry recorded: {}", entry.id);
    print_json(&json!({ "event": event, "entry": entry }))?;
    session.finish().await;
    Ok(())
}
