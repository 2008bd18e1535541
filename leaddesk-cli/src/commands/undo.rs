//! Undo command - remove every row an import inserted

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Confirm;

use super::{get_context, get_logger, log_event};
use crate::output;
use leaddesk_core::services::LogEvent;
use leaddesk_core::{Error, OperationResult};

pub fn run(import_id: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("undo"));

    let record = ctx
        .tracker
        .get_import(import_id)?
        .with_context(|| format!("Import '{}' not found", import_id))?;

    if record.is_undone() {
        anyhow::bail!(
            "Import '{}' was already undone on {}",
            import_id,
            output::format_time(record.undone_at.as_ref())
        );
    }

    if !force {
        let display = ctx.registry.display_name_for(&record.import_type);
        println!(
            "\n{}",
            format!(
                "This will permanently delete {} {} rows imported from '{}'.",
                record.imported_record_ids.len(),
                display,
                record.file_name
            )
            .yellow()
        );
        println!("{}\n", "This cannot be reversed.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let result = match ctx.undo_service.undo(&record) {
        Ok(result) => result,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_undo_failed")
                    .with_import_type(record.import_type.clone())
                    .with_error(e.to_string())
                    .with_error_details(format!("import_id={}", import_id)),
            );
            if json {
                let failed = OperationResult::<()>::fail(e.to_string())
                    .with_context("import_id", serde_json::json!(import_id));
                println!("{}", serde_json::to_string_pretty(&failed)?);
            }
            return Err(match e {
                Error::UnknownImportType(t) => {
                    anyhow::anyhow!("Import '{}' has unknown type '{}'", import_id, t)
                }
                other => other.into(),
            });
        }
    };

    log_event(
        &logger,
        LogEvent::new("import_undone").with_import_type(result.import_type.clone()),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&result))?);
        return Ok(());
    }

    output::success(&format!(
        "Deleted {} rows from {}",
        result.deleted, result.table_name
    ));
    if result.deleted < result.requested {
        output::warning(&format!(
            "  {} rows were already gone",
            result.requested - result.deleted
        ));
    }
    if !result.marked_undone {
        output::warning("  The import could not be marked as undone; history will still show it as active.");
    }

    Ok(())
}
