use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "hourglass", version, about = "Hourglass time tracker")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Time entry management
    Entry {
        #[command(subcommand)]
        action: commands::entry::EntryAction,
    },
    /// Project management
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Push entries to Notion / Google Sheets
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Integration settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Notion database helpers
    Notion {
        #[command(subcommand)]
        action: commands::notion::NotionAction,
    },
    /// Google Sheets helpers
    Sheets {
        #[command(subcommand)]
        action: commands::sheets::SheetsAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
/// `HOURGLASS_LOG` (or `RUST_LOG`) overrides the level picked by `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("HOURGLASS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();
    let _ = subscriber.try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Entry { action } => commands::entry::run(action).await,
        Commands::Project { action } => commands::project::run(action),
        Commands::Sync { action } => commands::sync::run(action).await,
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Notion { action } => commands::notion::run(action).await,
        Commands::Sheets { action } => commands::sheets::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
