//! LeadDesk Core - CSV imports, import history and undo for clinic lead data
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Appointments, import types, import records
//! - **ports**: The `Repository` trait the services depend on
//! - **services**: Parsing, validation, import, tracking, undo, jobs, status
//! - **adapters**: Concrete stores (local DuckDB, hosted REST API)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::rest::RestRepository;
use config::{BackendKind, Config};
use ports::Repository;
use services::*;

pub use domain::result::{Error, OperationResult};
pub use domain::{Appointment, ImportRecord, ImportType, ImportTypeRegistry};

/// File name of the local database inside the data directory
pub const LOCAL_DB_FILE: &str = "leaddesk.duckdb";

/// Main context for LeadDesk operations
///
/// Holds the configured repository, the shared import type registry and
/// every service built on top of them.
pub struct LeaddeskContext {
    pub config: Config,
    pub repository: Arc<dyn Repository>,
    pub registry: Arc<ImportTypeRegistry>,
    pub tracker: ImportTracker,
    pub import_service: ImportService,
    pub undo_service: UndoService,
    pub job_service: JobService,
    pub status_service: StatusService,
}

impl LeaddeskContext {
    /// Build a context from the settings in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let repository: Arc<dyn Repository> = match config.backend {
            BackendKind::Local => {
                std::fs::create_dir_all(data_dir)?;
                let repo = DuckDbRepository::new(&data_dir.join(LOCAL_DB_FILE))?;
                repo.ensure_schema()?;
                Arc::new(repo)
            }
            BackendKind::Rest => {
                let url = config
                    .api_url
                    .as_deref()
                    .context("No backend URL configured (set LEADDESK_API_URL or run setup)")?;
                let key = config
                    .api_key
                    .as_deref()
                    .context("No backend API key configured (set LEADDESK_API_KEY or run setup)")?;
                Arc::new(RestRepository::new(url, key)?)
            }
        };

        Ok(Self::with_repository(config, repository))
    }

    /// Build a context around an existing repository
    pub fn with_repository(config: Config, repository: Arc<dyn Repository>) -> Self {
        let registry = Arc::new(ImportTypeRegistry::default());
        let tracker = ImportTracker::new(Arc::clone(&repository));

        let import_service = ImportService::new(
            Arc::clone(&repository),
            Arc::clone(&registry),
            tracker.clone(),
        );
        let undo_service = UndoService::new(
            Arc::clone(&repository),
            Arc::clone(&registry),
            tracker.clone(),
        );
        let job_service = JobService::new(Arc::clone(&repository));
        let status_service = StatusService::new(
            Arc::clone(&repository),
            Arc::clone(&registry),
            tracker.clone(),
        );

        Self {
            config,
            repository,
            registry,
            tracker,
            import_service,
            undo_service,
            job_service,
            status_service,
        }
    }

    /// Attribution for an import: explicit value, then configured default
    pub fn imported_by(&self, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.config.imported_by.clone())
    }
}
