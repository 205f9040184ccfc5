//! Time entry commands.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use hourglass_core::{format_duration, EntryFilter, EntryPatch, EntrySource, NewEntry, TimeEntry};

use super::{
    parse_date, parse_duration, parse_time_on, print_json, resolve_projects, CmdResult, Session,
};

#[derive(Subcommand)]
pub enum EntryAction {
    /// Record time by hand
    Add {
        /// Project id or name (repeatable)
        #[arg(long = "project", short = 'p', required = true)]
        projects: Vec<String>,
        /// Duration such as 1h30m, 01:30:00 or 5400 (seconds)
        #[arg(long, short = 'd', value_parser = parse_duration)]
        duration: Option<u64>,
        /// Start time (HH:MM on --date, or RFC 3339)
        #[arg(long)]
        start: Option<String>,
        /// End time (HH:MM on --date, or RFC 3339)
        #[arg(long)]
        end: Option<String>,
        /// Day the time belongs to (defaults to today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
        /// Reference link (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List entries, newest first
    List {
        /// Only entries linked to this project (id or name)
        #[arg(long)]
        project: Option<String>,
        /// First day to include
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        /// Last day to include
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one entry as JSON
    Show { id: String },
    /// Change fields of an entry
    Edit {
        id: String,
        /// Replace the linked projects (repeatable)
        #[arg(long = "project", short = 'p')]
        projects: Vec<String>,
        #[arg(long, short = 'd', value_parser = parse_duration)]
        duration: Option<u64>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long, conflicts_with = "clear_times")]
        start: Option<String>,
        #[arg(long, conflicts_with = "clear_times")]
        end: Option<String>,
        /// Remove start and end times
        #[arg(long)]
        clear_times: bool,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
        /// Replace the reference links (repeatable)
        #[arg(long = "link")]
        links: Vec<String>,
        /// Replace the tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete an entry and its mirror records
    Delete { id: String },
}

pub async fn run(action: EntryAction) -> CmdResult {
    let session = Session::open()?;
    let result = dispatch(&session, action);
    session.finish().await;
    result
}

fn dispatch(session: &Session, action: EntryAction) -> CmdResult {
    let service = &session.service;

    match action {
        EntryAction::Add {
            projects,
            duration,
            start,
            end,
            date,
            notes,
            links,
            tags,
        } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let start_time = start.map(|s| parse_time_on(date, &s)).transpose()?;
            let end_time = end.map(|s| parse_time_on(date, &s)).transpose()?;

            let duration_secs = match (duration, start_time, end_time) {
                (Some(secs), _, _) => secs,
                (None, Some(start), Some(end)) if end >= start => {
                    (end - start).num_seconds() as u64
                }
                (None, Some(_), Some(_)) => return Err("--end must not be before --start".into()),
                _ => return Err("give --duration, or both --start and --end".into()),
            };

            let entry = service.create(NewEntry {
                project_ids: resolve_projects(service, &projects)?,
                duration_secs,
                date,
                start_time,
                end_time,
                notes,
                reference_links: links,
                tags,
                source: EntrySource::Manual,
            })?;
            eprintln!("Entry created: {}", entry.id);
            print_json(&entry)?;
        }
        EntryAction::List {
            project,
            from,
            to,
            json,
        } => {
            let project_id = project
                .map(|p| service.resolve_project(&p).map(|p| p.id))
                .transpose()?;
            let entries = service.list(&EntryFilter {
                project_id,
                date_from: from,
                date_to: to,
            })?;
            if json {
                print_json(&entries)?;
            } else {
                print_table(&entries);
            }
        }
        EntryAction::Show { id } => {
            print_json(&service.get(&id)?)?;
        }
        EntryAction::Edit {
            id,
            projects,
            duration,
            date,
            start,
            end,
            clear_times,
            notes,
            clear_notes,
            links,
            tags,
        } => {
            // Times given as HH:MM are read on the entry's (possibly new) date.
            let on = match date {
                Some(date) => date,
                None => service.get(&id)?.date,
            };
            let mut patch = EntryPatch {
                duration_secs: duration,
                date,
                ..Default::default()
            };
            if !projects.is_empty() {
                patch.project_ids = Some(resolve_projects(service, &projects)?);
            }
            if clear_times {
                patch.start_time = Some(None);
                patch.end_time = Some(None);
            }
            if let Some(start) = start {
                patch.start_time = Some(Some(parse_time_on(on, &start)?));
            }
            if let Some(end) = end {
                patch.end_time = Some(Some(parse_time_on(on, &end)?));
            }
            if clear_notes {
                patch.notes = Some(None);
            } else if let Some(notes) = notes {
                patch.notes = Some(Some(notes));
            }
            if !links.is_empty() {
                patch.reference_links = Some(links);
            }
            if !tags.is_empty() {
                patch.tags = Some(tags);
            }
            if patch.is_empty() {
                return Err("nothing to change".into());
            }

            let entry = service.update(&id, patch)?;
            eprintln!("Entry updated: {}", entry.id);
            print_json(&entry)?;
        }
        EntryAction::Delete { id } => {
            service.delete(&id)?;
            eprintln!("Entry deleted: {id}");
        }
    }
    Ok(())
}

fn print_table(entries: &[TimeEntry]) {
    if entries.is_empty() {
        println!("No entries.");
        return;
    }
    for entry in entries {
        println!(
            "{}  {}  {}  {:<24}  {}",
            entry.id,
            entry.date,
            format_duration(entry.duration_secs),
            entry.project_names.join(", "),
            entry.notes.as_deref().unwrap_or("")
        );
    }
    let total: u64 = entries.iter().map(|e| e.duration_secs).sum();
    println!("Total: {} across {} entries", format_duration(total), entries.len());
}
