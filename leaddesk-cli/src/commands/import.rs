//! Import command - import appointments from CSV

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use super::{get_context, get_logger, log_event};
use crate::output;
use leaddesk_core::domain::Flag;
use leaddesk_core::services::{ImportResult, LogEvent};
use leaddesk_core::OperationResult;

/// Preview rows shown before truncating
const PREVIEW_ROWS: usize = 10;

pub fn run(file: &Path, preview: bool, imported_by: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("import"));

    let imported_by = ctx.imported_by(imported_by);
    let result = match ctx
        .import_service
        .import_appointments_file(file, imported_by, preview)
    {
        Ok(result) => result,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_failed")
                    .with_import_type("appointments")
                    .with_command("import")
                    .with_error(e.to_string())
                    .with_error_details(format!("file={}", file.display())),
            );
            if json {
                let failed = OperationResult::<()>::fail(e.to_string())
                    .with_context("file", serde_json::json!(file.display().to_string()));
                println!("{}", serde_json::to_string_pretty(&failed)?);
            }
            return Err(e.into());
        }
    };

    if !preview {
        if result.tracking_failed() {
            log_event(
                &logger,
                LogEvent::new("import_tracking_failed")
                    .with_import_type("appointments")
                    .with_error("import history was not recorded")
                    .with_error_details(format!("rows={}", result.imported)),
            );
        } else {
            log_event(
                &logger,
                LogEvent::new("import_completed").with_import_type("appointments"),
            );
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&result))?);
        return Ok(());
    }

    if preview {
        print_preview(&result);
    } else {
        print_summary(&result);
    }
    print_failures(&result);

    Ok(())
}

fn print_preview(result: &ImportResult) {
    println!(
        "\n{} {} ({} valid, {} invalid)\n",
        "Preview:".bold(),
        result.file_name,
        result.rows.len(),
        result.failed
    );

    let mut table = output::create_table();
    table.set_header(vec!["Created", "Project", "Lead", "Appointment", "Showed", "Confirmed"]);
    for row in result.rows.iter().take(PREVIEW_ROWS) {
        table.add_row(vec![
            row.date_appointment_created.clone(),
            row.project_name.clone(),
            row.lead_name.clone(),
            row.date_of_appointment.clone().unwrap_or_default(),
            flag_cell(row.showed),
            flag_cell(row.confirmed),
        ]);
    }
    println!("{}", table);

    if result.rows.len() > PREVIEW_ROWS {
        println!("{}", format!("... and {} more", result.rows.len() - PREVIEW_ROWS).dimmed());
    }
    println!("\n{}", "Nothing was written. Run without --preview to import.".dimmed());
}

fn print_summary(result: &ImportResult) {
    output::success(&format!(
        "Imported {} of {} rows from {}",
        result.imported, result.total_rows, result.file_name
    ));

    match &result.import_id {
        Some(id) => println!("  Import ID: {}", id.cyan()),
        None => output::warning(
            "  Rows were imported, but the import could not be recorded and cannot be undone.",
        ),
    }
}

fn print_failures(result: &ImportResult) {
    if result.failures.is_empty() {
        return;
    }
    println!("\n{}", format!("{} rows skipped:", result.failed).yellow());
    for failure in &result.failures {
        println!("  line {}: {}", failure.row, failure.error);
    }
}

fn flag_cell(flag: Flag) -> String {
    match flag {
        Flag::True => "yes".to_string(),
        Flag::False => "no".to_string(),
        Flag::Unknown => "-".to_string(),
    }
}
