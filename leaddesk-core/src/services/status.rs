//! Status service - row counts per import table and import history totals

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::domain::result::Result;
use crate::domain::{ImportRecord, ImportTypeRegistry};
use crate::ports::Repository;
use crate::services::tracker::ImportTracker;

pub struct StatusService {
    repository: Arc<dyn Repository>,
    registry: Arc<ImportTypeRegistry>,
    tracker: ImportTracker,
}

impl StatusService {
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

    /// Summarize the store.
    ///
    /// A table that cannot be counted is reported with its error instead of
    /// failing the whole summary.
    pub fn get_status(&self) -> Result<StatusSummary> {
        let tables = self
            .registry
            .descriptors()
            .iter()
            .map(|d| {
                let (row_count, error) = match self.repository.count(&d.table_name) {
                    Ok(n) => (Some(n), None),
                    Err(e) => {
                        warn!(table = %d.table_name, error = %e, "could not count rows");
                        (None, Some(e.to_string()))
                    }
                };
                TableStatus {
                    import_type: d.key.clone(),
                    display_name: d.display_name.clone(),
                    glyph: d.glyph.clone(),
                    table_name: d.table_name.clone(),
                    row_count,
                    error,
                }
            })
            .collect();

        let total_imports = self.tracker.count()?;
        let last_import = self.tracker.list_imports(1)?.into_iter().next();

        Ok(StatusSummary {
            backend: self.repository.name().to_string(),
            tables,
            total_imports,
            last_import,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub backend: String,
    pub tables: Vec<TableStatus>,
    pub total_imports: i64,
    pub last_import: Option<ImportRecord>,
}

#[derive(Debug, Serialize)]
pub struct TableStatus {
    pub import_type: String,
    pub display_name: String,
    pub glyph: String,
    pub table_name: String,
    pub row_count: Option<i64>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::{ImportTrackingData, ImportType};

    #[test]
    fn test_status_of_fresh_store() {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let repo: Arc<dyn Repository> = Arc::new(repo);
        let tracker = ImportTracker::new(repo.clone());
        let service = StatusService::new(
            repo,
            Arc::new(ImportTypeRegistry::default()),
            tracker.clone(),
        );

        let status = service.get_status().unwrap();
        assert_eq!(status.backend, "duckdb");
        assert_eq!(status.tables.len(), 4);
        assert!(status.tables.iter().all(|t| t.row_count == Some(0)));
        assert_eq!(status.total_imports, 0);
        assert!(status.last_import.is_none());

        tracker
            .record_import(ImportTrackingData {
                import_type: ImportType::Calls,
                file_name: "calls.csv".to_string(),
                records_imported: 0,
                records_failed: 0,
                imported_record_ids: Vec::new(),
                import_summary: None,
                imported_by: None,
            })
            .unwrap();

        let status = service.get_status().unwrap();
        assert_eq!(status.total_imports, 1);
        assert_eq!(status.last_import.unwrap().file_name, "calls.csv");
    }

    #[test]
    fn test_missing_table_is_reported_not_fatal() {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let repo: Arc<dyn Repository> = Arc::new(repo);
        let registry = ImportTypeRegistry::new(vec![crate::domain::ImportTypeDescriptor::new(
            "invoices",
            "invoices",
            "Invoices",
            "🧾",
        )]);
        let service = StatusService::new(repo.clone(), Arc::new(registry), ImportTracker::new(repo));

        let status = service.get_status().unwrap();
        assert_eq!(status.tables[0].row_count, None);
        assert!(status.tables[0].error.is_some());
    }
}
