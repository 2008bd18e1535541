//! History command - list tracked imports

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(limit: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let imports = ctx.tracker.list_imports(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&imports)?);
        return Ok(());
    }

    if imports.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Type", "File", "Imported", "Failed", "By", "When", "State"]);

    for record in &imports {
        let state = if record.is_undone() {
            format!("undone {}", output::format_time(record.undone_at.as_ref()))
                .dimmed()
                .to_string()
        } else {
            "active".green().to_string()
        };

        table.add_row(vec![
            record.id.clone(),
            format!(
                "{} {}",
                ctx.registry.glyph_for(&record.import_type),
                ctx.registry.display_name_for(&record.import_type)
            ),
            record.file_name.clone(),
            record.records_imported.to_string(),
            record.records_failed.to_string(),
            record.imported_by.clone(),
            output::format_time(record.imported_at.as_ref()),
            state,
        ]);
    }

    println!("{}", table);
    Ok(())
}
