//! CLI command implementations

pub mod history;
pub mod import;
pub mod jobs;
pub mod logs;
pub mod setup;
pub mod status;
pub mod template;
pub mod undo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use leaddesk_core::services::{LogEvent, LoggingService};
use leaddesk_core::LeaddeskContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, "cli", env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "event log write failed");
        }
    }
}

/// Data directory from `LEADDESK_DIR` or `~/.leaddesk`
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEADDESK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".leaddesk"))
        .context("Could not find home directory (set LEADDESK_DIR)")
}

/// Build the context for the configured backend
pub fn get_context() -> Result<LeaddeskContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    LeaddeskContext::new(&data_dir).context("Failed to initialize leaddesk context")
}
