//! Import service - CSV upload to validated, tracked rows

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{
    validate_appointment, Appointment, ImportTrackingData, ImportType, ImportTypeRegistry,
};
use crate::ports::{Repository, Row};
use crate::services::parser::parse_csv_lines;
use crate::services::tracker::ImportTracker;

/// One uploaded file
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub file_name: String,
    pub content: String,
    pub imported_by: Option<String>,
    /// Validate only; nothing is written
    pub preview: bool,
}

/// A data row that failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 1-based line in the uploaded file (the header is line 1)
    pub row: usize,
    pub error: String,
}

/// Outcome of an import or preview
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub import_type: ImportType,
    pub file_name: String,
    /// `None` for previews and when the history write failed
    pub import_id: Option<String>,
    pub total_rows: usize,
    pub imported: usize,
    pub failed: usize,
    pub imported_record_ids: Vec<String>,
    pub failures: Vec<RowFailure>,
    pub preview: bool,
    /// Validated rows, only filled for previews
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Appointment>,
}

impl ImportResult {
    /// Rows were written but the import cannot be undone
    pub fn tracking_failed(&self) -> bool {
        !self.preview && self.import_id.is_none()
    }
}

pub struct ImportService {
    repository: Arc<dyn Repository>,
    registry: Arc<ImportTypeRegistry>,
    tracker: ImportTracker,
}

impl ImportService {
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

    /// Read a file from disk and import it as appointments
    pub fn import_appointments_file(
        &self,
        path: &Path,
        imported_by: Option<String>,
        preview: bool,
    ) -> Result<ImportResult> {
        let content = std::fs::read_to_string(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.import_appointments(ImportRequest {
            file_name,
            content,
            imported_by,
            preview,
        })
    }

    /// Parse, validate and insert an appointment CSV.
    ///
    /// Valid rows go in as one batch; invalid rows are reported with their
    /// line numbers and never block the valid ones.
    pub fn import_appointments(&self, request: ImportRequest) -> Result<ImportResult> {
        let import_type = ImportType::Appointments;
        let lines = parse_csv_lines(&request.content);
        if lines.is_empty() {
            return Err(Error::parse(format!(
                "{} has no data rows",
                request.file_name
            )));
        }

        let mut valid = Vec::with_capacity(lines.len());
        let mut failures = Vec::new();
        for parsed in &lines {
            match validate_appointment(&parsed.row) {
                Ok(appointment) => valid.push(appointment),
                Err(e) => failures.push(RowFailure {
                    row: parsed.line,
                    error: e.to_string(),
                }),
            }
        }

        if !failures.is_empty() {
            warn!(
                file_name = %request.file_name,
                failed = failures.len(),
                "rows failed validation"
            );
        }

        if request.preview {
            return Ok(ImportResult {
                import_type,
                file_name: request.file_name,
                import_id: None,
                total_rows: lines.len(),
                imported: 0,
                failed: failures.len(),
                imported_record_ids: Vec::new(),
                failures,
                preview: true,
                rows: valid,
            });
        }

        let table = self
            .registry
            .table_name_for(import_type.as_str())
            .ok_or_else(|| Error::UnknownImportType(import_type.to_string()))?;

        let rows = valid
            .iter()
            .map(Appointment::to_row)
            .collect::<Result<Vec<Row>>>()?;

        let ids = self.repository.insert_rows(table, &rows).map_err(|e| {
            error!(table, rows = rows.len(), error = %e, "appointment insert failed");
            e
        })?;

        let mut summary = serde_json::Map::new();
        summary.insert("total_rows".into(), json!(lines.len()));
        summary.insert("failed_rows".into(), json!(failures));
        summary.insert("file_sha256".into(), json!(fingerprint(&request.content)));

        let import_id = self.tracker.record_import(ImportTrackingData {
            import_type,
            file_name: request.file_name.clone(),
            records_imported: ids.len() as u64,
            records_failed: failures.len() as u64,
            imported_record_ids: ids.clone(),
            import_summary: Some(summary),
            imported_by: request.imported_by,
        });

        info!(
            file_name = %request.file_name,
            imported = ids.len(),
            failed = failures.len(),
            import_id = ?import_id,
            "import finished"
        );

        Ok(ImportResult {
            import_type,
            file_name: request.file_name,
            import_id,
            total_rows: lines.len(),
            imported: ids.len(),
            failed: failures.len(),
            imported_record_ids: ids,
            failures,
            preview: false,
            rows: Vec::new(),
        })
    }
}

/// Hex SHA-256 of the uploaded text
fn fingerprint(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::IMPORT_HISTORY_TABLE;
    use crate::ports::SelectQuery;
    use serde_json::Value as JsonValue;

    /// DuckDB store whose history table refuses writes
    struct HistoryDownRepository {
        inner: DuckDbRepository,
    }

    impl Repository for HistoryDownRepository {
        fn name(&self) -> &str {
            "history-down"
        }

        fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<Vec<String>> {
            if table == IMPORT_HISTORY_TABLE {
                return Err(Error::database("history table is read-only"));
            }
            self.inner.insert_rows(table, rows)
        }

        fn update_row(&self, table: &str, id: &str, patch: &Row) -> Result<()> {
            self.inner.update_row(table, id, patch)
        }

        fn delete_by_ids(&self, table: &str, ids: &[String]) -> Result<usize> {
            self.inner.delete_by_ids(table, ids)
        }

        fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>> {
            self.inner.select(table, query)
        }

        fn count(&self, table: &str) -> Result<i64> {
            self.inner.count(table)
        }

        fn rpc(&self, function: &str, params: &JsonValue) -> Result<JsonValue> {
            self.inner.rpc(function, params)
        }
    }

    const HEADER: &str = "date_appointment_created,project_name,lead_name,lead_email,showed";

    fn service() -> (ImportService, ImportTracker) {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let repo: Arc<dyn Repository> = Arc::new(repo);
        let tracker = ImportTracker::new(repo.clone());
        let service = ImportService::new(
            repo,
            Arc::new(ImportTypeRegistry::default()),
            tracker.clone(),
        );
        (service, tracker)
    }

    fn request(content: &str, preview: bool) -> ImportRequest {
        ImportRequest {
            file_name: "appointments.csv".to_string(),
            content: content.to_string(),
            imported_by: Some("ops@clinic.test".to_string()),
            preview,
        }
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_header_only_is_parse_error() {
        let (service, _) = service();
        let err = service.import_appointments(request(HEADER, false)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_partial_failure_reports_line_numbers() {
        let (service, tracker) = service();
        let content = format!(
            "{}\n2024-05-01,North,Ann,ann@x.test,true\n2024-05-02,North,,,\n\n2024-05-03,South,Bo,,0",
            HEADER
        );
        let result = service.import_appointments(request(&content, false)).unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.imported, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures[0].row, 3);
        assert!(result.failures[0].error.contains("lead_name"));
        assert!(!result.tracking_failed());

        let record = tracker
            .get_import(result.import_id.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.imported_record_ids, result.imported_record_ids);
        assert_eq!(record.records_failed, 1);
        assert_eq!(record.imported_by, "ops@clinic.test");
        let summary = record.import_summary.unwrap();
        assert_eq!(summary["total_rows"], 3);
        assert_eq!(summary["failed_rows"][0]["row"], 3);
    }

    #[test]
    fn test_preview_writes_nothing() {
        let (service, tracker) = service();
        let content = format!("{}\n2024-05-01,North,Ann,,", HEADER);
        let result = service.import_appointments(request(&content, true)).unwrap();

        assert!(result.preview);
        assert!(result.import_id.is_none());
        assert!(!result.tracking_failed());
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].lead_name, "Ann");
        assert_eq!(tracker.count().unwrap(), 0);
    }

    #[test]
    fn test_history_failure_keeps_inserted_rows() {
        let inner = DuckDbRepository::in_memory().unwrap();
        inner.ensure_schema().unwrap();
        let repo: Arc<dyn Repository> = Arc::new(HistoryDownRepository { inner });
        let service = ImportService::new(
            repo.clone(),
            Arc::new(ImportTypeRegistry::default()),
            ImportTracker::new(repo.clone()),
        );

        let content = format!("{}\n2024-05-01,North,Ann,,\n2024-05-02,South,Bo,,", HEADER);
        let result = service.import_appointments(request(&content, false)).unwrap();

        assert_eq!(result.imported, 2);
        assert_eq!(result.imported_record_ids.len(), 2);
        assert!(result.import_id.is_none());
        assert!(result.tracking_failed());
        assert_eq!(repo.count("all_appointments").unwrap(), 2);
        assert_eq!(repo.count(IMPORT_HISTORY_TABLE).unwrap(), 0);
    }

    #[test]
    fn test_all_rows_invalid_is_still_tracked() {
        let (service, tracker) = service();
        let content = format!("{}\n2024-05-01,,Ann,,", HEADER);
        let result = service.import_appointments(request(&content, false)).unwrap();

        assert_eq!(result.imported, 0);
        assert_eq!(result.failed, 1);
        assert!(result.import_id.is_some());
        assert_eq!(tracker.count().unwrap(), 1);
    }
}
