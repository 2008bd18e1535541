//! Jobs command - run backend jobs

use anyhow::Result;
use clap::Subcommand;

use super::{get_context, get_logger, log_event};
use crate::output;
use leaddesk_core::services::LogEvent;

#[derive(Subcommand)]
pub enum JobsCommands {
    /// Recalculate speed-to-lead for new leads
    SpeedToLead {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract structured fields from intake notes
    ParseIntakeNotes {
        /// Limit to one project
        #[arg(long)]
        project: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: JobsCommands) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let (name, json, outcome) = match command {
        JobsCommands::SpeedToLead { json } => (
            "speed_to_lead",
            json,
            ctx.job_service.run_speed_to_lead(),
        ),
        JobsCommands::ParseIntakeNotes { project, json } => (
            "parse_intake_notes",
            json,
            ctx.job_service.auto_parse_intake_notes(project.as_deref()),
        ),
    };

    let outcome = match outcome {
        Ok(outcome) => {
            log_event(&logger, LogEvent::new(format!("job_{}_completed", name)));
            outcome
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new(format!("job_{}_failed", name)).with_error(e.to_string()),
            );
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    output::success(&format!("{} finished in {} ms", outcome.job, outcome.duration_ms));
    if !outcome.result.is_null() {
        output::info(&serde_json::to_string_pretty(&outcome.result)?);
    }

    Ok(())
}
