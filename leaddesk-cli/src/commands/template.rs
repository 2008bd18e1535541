//! Template command - write the appointments CSV template

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::output;
use leaddesk_core::services::{appointment_template, TEMPLATE_FILE_NAME};

pub fn run(output_path: Option<PathBuf>, stdout: bool) -> Result<()> {
    let template = appointment_template()?;

    if stdout {
        print!("{}", template);
        return Ok(());
    }

    let path = output_path.unwrap_or_else(|| PathBuf::from(TEMPLATE_FILE_NAME));
    std::fs::write(&path, template)
        .with_context(|| format!("Failed to write template to {}", path.display()))?;
    output::success(&format!("Template written to {}", path.display()));

    Ok(())
}
