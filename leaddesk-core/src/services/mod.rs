//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case: importing, tracking, undoing, running
//! backend jobs, reporting status.

pub mod import;
mod jobs;
pub mod logging;
pub mod migration;
pub mod parser;
mod status;
pub mod template;
mod tracker;
mod undo;

pub use import::{ImportRequest, ImportResult, ImportService, RowFailure};
pub use jobs::{JobOutcome, JobService, AUTO_PARSE_INTAKE_NOTES_FUNCTION, SPEED_TO_LEAD_FUNCTION};
pub use logging::{LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use parser::{parse_csv, parse_csv_lines, ParsedLine};
pub use status::{StatusService, StatusSummary, TableStatus};
pub use template::{appointment_template, TEMPLATE_FILE_NAME, TEMPLATE_MIME_TYPE};
pub use tracker::ImportTracker;
pub use undo::{UndoResult, UndoService};
