//! LeadDesk CLI - clinic lead imports from your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{history, import, jobs, logs, setup, status, template, undo};

/// LeadDesk - import, review and undo clinic lead data
#[derive(Parser)]
#[command(name = "leaddesk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an appointments CSV
    Import {
        /// Path to CSV file
        file: PathBuf,
        /// Validate and show rows without writing anything
        #[arg(long)]
        preview: bool,
        /// Who the import is attributed to
        #[arg(long)]
        imported_by: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the appointments CSV template
    Template {
        /// Output path (defaults to appointments_template.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Show import history, newest first
    History {
        /// Number of imports to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every row an import inserted
    Undo {
        /// Import ID from `history`
        import_id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON (requires --force)
        #[arg(long, requires = "force")]
        json: bool,
    },

    /// Show row counts per import type
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run backend jobs
    Jobs {
        #[command(subcommand)]
        command: jobs::JobsCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Configure the backing store
    Setup {
        #[command(subcommand)]
        command: setup::SetupCommands,
    },
}

/// Diagnostics go to stderr so `--json` output stays clean
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LEADDESK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import { file, preview, imported_by, json } => {
            import::run(&file, preview, imported_by, json)
        }
        Commands::Template { output, stdout } => template::run(output, stdout),
        Commands::History { limit, json } => history::run(limit, json),
        Commands::Undo { import_id, force, json } => undo::run(&import_id, force, json),
        Commands::Status { json } => status::run(json),
        Commands::Jobs { command } => jobs::run(command),
        Commands::Logs { command } => logs::run(command),
        Commands::Setup { command } => setup::run(command),
    }
}
