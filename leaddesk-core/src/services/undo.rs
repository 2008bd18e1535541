//! Undo of tracked imports

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{ImportRecord, ImportTypeRegistry};
use crate::ports::Repository;
use crate::services::tracker::ImportTracker;

/// What an undo removed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndoResult {
    pub import_id: String,
    pub import_type: String,
    pub table_name: String,
    /// Ids listed on the history record
    pub requested: usize,
    /// Rows that were actually still there
    pub deleted: usize,
    /// False when the rows are gone but `undone_at` could not be written
    pub marked_undone: bool,
}

pub struct UndoService {
    repository: Arc<dyn Repository>,
    registry: Arc<ImportTypeRegistry>,
    tracker: ImportTracker,
}

impl UndoService {
    pub fn new(
        repository: Arc<dyn Repository>,
        registry: Arc<ImportTypeRegistry>,
        tracker: ImportTracker,
    ) -> Self {
        Self {
            repository,
            registry,
            tracker,
        }
    }

    /// Delete every row an import inserted, then stamp the record undone.
    ///
    /// Rows are removed with a single delete-by-id call against the table
    /// the registry maps the import type to. The history record itself is
    /// kept.
    pub fn undo(&self, record: &ImportRecord) -> Result<UndoResult> {
        if record.is_undone() {
            return Err(Error::AlreadyUndone(record.id.clone()));
        }

        let table = self
            .registry
            .table_name_for(&record.import_type)
            .ok_or_else(|| Error::UnknownImportType(record.import_type.clone()))?;

        let requested = record.imported_record_ids.len();
        let deleted = if requested == 0 {
            0
        } else {
            self.repository
                .delete_by_ids(table, &record.imported_record_ids)
                .map_err(|e| {
                    error!(import_id = %record.id, table, error = %e, "undo delete failed");
                    e
                })?
        };

        if deleted < requested {
            warn!(
                import_id = %record.id,
                requested,
                deleted,
                "some imported rows were already gone"
            );
        }

        let marked_undone = match self.tracker.mark_undone(&record.id, Utc::now()) {
            Ok(()) => true,
            Err(e) => {
                warn!(import_id = %record.id, error = %e, "rows deleted but import not marked undone");
                false
            }
        };

        info!(import_id = %record.id, table, deleted, "import undone");

        Ok(UndoResult {
            import_id: record.id.clone(),
            import_type: record.import_type.clone(),
            table_name: table.to_string(),
            requested,
            deleted,
            marked_undone,
        })
    }

    /// Look up a history record and undo it
    pub fn undo_by_id(&self, import_id: &str) -> Result<UndoResult> {
        let record = self
            .tracker
            .get_import(import_id)?
            .ok_or_else(|| Error::not_found(format!("import {}", import_id)))?;
        self.undo(&record)
    }
}
