//! Import history tracking
//!
//! Every import attempt gets one row in `csv_import_history` holding the
//! ids it inserted. That list is what makes an import undoable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, error};

use crate::domain::result::{Error, Result};
use crate::domain::{
    format_store_timestamp, ImportRecord, ImportTrackingData, DEFAULT_IMPORTED_BY,
    IMPORT_HISTORY_TABLE,
};
use crate::ports::{Repository, Row, SelectQuery};

/// Records and reads import history
#[derive(Clone)]
pub struct ImportTracker {
    repository: Arc<dyn Repository>,
}

impl ImportTracker {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Persist one import attempt and return its id.
    ///
    /// Never fails the caller: the data rows are already written by the
    /// time this runs, so a tracking failure is logged and reported as
    /// `None`.
    pub fn record_import(&self, data: ImportTrackingData) -> Option<String> {
        match self.try_record_import(&data) {
            Ok(id) => {
                debug!(import_id = %id, import_type = %data.import_type, "recorded import");
                Some(id)
            }
            Err(e) => {
                error!(
                    import_type = %data.import_type,
                    file_name = %data.file_name,
                    error = %e,
                    "failed to record import history"
                );
                None
            }
        }
    }

    fn try_record_import(&self, data: &ImportTrackingData) -> Result<String> {
        let row = tracking_row(data);
        self.repository
            .insert_rows(IMPORT_HISTORY_TABLE, &[row])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::database("Import history insert returned no id"))
    }

    /// Most recent imports first
    pub fn list_imports(&self, limit: usize) -> Result<Vec<ImportRecord>> {
        let query = SelectQuery::new().order_desc("imported_at").limit(limit);
        self.repository
            .select(IMPORT_HISTORY_TABLE, &query)?
            .into_iter()
            .map(row_to_record)
            .collect()
    }

    pub fn get_import(&self, import_id: &str) -> Result<Option<ImportRecord>> {
        let query = SelectQuery::new().eq("id", import_id).limit(1);
        self.repository
            .select(IMPORT_HISTORY_TABLE, &query)?
            .into_iter()
            .next()
            .map(row_to_record)
            .transpose()
    }

    /// Stamp `undone_at` on a history row
    pub fn mark_undone(&self, import_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut patch = Row::new();
        patch.insert(
            "undone_at".to_string(),
            JsonValue::String(format_store_timestamp(&at)),
        );
        self.repository.update_row(IMPORT_HISTORY_TABLE, import_id, &patch)
    }

    /// Number of tracked imports
    pub fn count(&self) -> Result<i64> {
        self.repository.count(IMPORT_HISTORY_TABLE)
    }
}

fn tracking_row(data: &ImportTrackingData) -> Row {
    let imported_by = data
        .imported_by
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_IMPORTED_BY);

    let mut row = Row::new();
    row.insert("import_type".into(), json!(data.import_type.as_str()));
    row.insert("file_name".into(), json!(data.file_name));
    row.insert("records_imported".into(), json!(data.records_imported));
    row.insert("records_failed".into(), json!(data.records_failed));
    row.insert("imported_record_ids".into(), json!(data.imported_record_ids));
    row.insert(
        "import_summary".into(),
        data.import_summary
            .clone()
            .map(JsonValue::Object)
            .unwrap_or(JsonValue::Null),
    );
    row.insert("imported_by".into(), json!(imported_by));
    row
}

fn row_to_record(row: Row) -> Result<ImportRecord> {
    serde_json::from_value(JsonValue::Object(row))
        .map_err(|e| Error::database(format!("Malformed import history row: {}", e)))
}
