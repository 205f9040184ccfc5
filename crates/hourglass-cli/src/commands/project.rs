//! Project management commands for CLI.

use clap::Subcommand;
use hourglass_core::{Database, EntryService, NewProject, ProjectPatch};

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        /// Project name (unique, case-insensitive)
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Hex color such as #3B82F6
        #[arg(long)]
        color: Option<String>,
    },
    /// List projects in creation order
    List {
        /// Include archived projects
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a project's name, description or color
    Edit {
        /// Project id or name
        project: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, conflicts_with = "clear_color")]
        color: Option<String>,
        #[arg(long)]
        clear_color: bool,
    },
    /// Hide a project from pickers; existing entries keep it
    Archive {
        /// Project id or name
        project: String,
    },
    /// Make an archived project selectable again
    Unarchive {
        /// Project id or name
        project: String,
    },
    /// Create the default projects that don't exist yet
    Seed,
}

pub fn run(action: ProjectAction) -> CmdResult {
    // Project edits never touch mirrors, so no sync worker is needed.
    let service = EntryService::new(Database::open()?.into_shared(), None);

    match action {
        ProjectAction::Create {
            name,
            description,
            color,
        } => {
            let project = service.create_project(NewProject {
                name: name.trim().to_string(),
                description,
                color,
            })?;
            eprintln!("Project created: {}", project.id);
            print_json(&project)?;
        }
        ProjectAction::List { all, json } => {
            let projects = service.list_projects(all)?;
            if json {
                print_json(&projects)?;
            } else if projects.is_empty() {
                println!("No projects. Create one with `hourglass project create <name>` or `hourglass project seed`.");
            } else {
                for p in &projects {
                    println!(
                        "{}  {:<24}  {:<8}{}",
                        p.id,
                        p.name,
                        p.color.as_deref().unwrap_or("-"),
                        if p.archived { "  (archived)" } else { "" }
                    );
                }
            }
        }
        ProjectAction::Edit {
            project,
            name,
            description,
            clear_description,
            color,
            clear_color,
        } => {
            let id = service.resolve_project(&project)?.id;
            let patch = ProjectPatch {
                name: name.map(|n| n.trim().to_string()),
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                color: if clear_color { Some(None) } else { color.map(Some) },
            };
            if patch == ProjectPatch::default() {
                return Err("nothing to change".into());
            }
            let updated = service.update_project(&id, patch)?;
            print_json(&updated)?;
        }
        ProjectAction::Archive { project } => {
            let id = service.resolve_project(&project)?.id;
            print_json(&service.set_project_archived(&id, true)?)?;
        }
        ProjectAction::Unarchive { project } => {
            let id = service.resolve_project(&project)?.id;
            print_json(&service.set_project_archived(&id, false)?)?;
        }
        ProjectAction::Seed => {
            let added = service.seed_default_projects()?;
            eprintln!("Added {added} default project(s)");
            print_json(&service.list_projects(false)?)?;
        }
    }
    Ok(())
}
