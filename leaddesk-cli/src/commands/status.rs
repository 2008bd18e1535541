//! Status command - row counts per import type

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{} ({})", "LeadDesk Status".bold(), status.backend.dimmed());
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Type", "Table", "Rows"]);
    for t in &status.tables {
        let rows = match (t.row_count, &t.error) {
            (Some(n), _) => n.to_string(),
            (None, Some(_)) => "error".red().to_string(),
            (None, None) => "-".to_string(),
        };
        table.add_row(vec![
            format!("{} {}", t.glyph, t.display_name),
            t.table_name.clone(),
            rows,
        ]);
    }
    println!("{}", table);
    println!();

    println!("Tracked imports: {}", status.total_imports);
    if let Some(last) = &status.last_import {
        println!(
            "Last import: {} ({} rows, {})",
            last.file_name,
            last.records_imported,
            output::format_time(last.imported_at.as_ref())
        );
    }

    for t in status.tables.iter().filter(|t| t.error.is_some()) {
        output::warning(&format!(
            "Could not count {}: {}",
            t.table_name,
            t.error.as_deref().unwrap_or_default()
        ));
    }

    Ok(())
}
