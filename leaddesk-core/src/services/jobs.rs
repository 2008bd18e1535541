//! Backend jobs triggered after imports
//!
//! Both jobs are stored procedures on the hosted backend. The local store
//! has no procedures and reports a configuration error.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{error, info};

use crate::domain::result::Result;
use crate::ports::Repository;

/// Recomputes time-to-first-contact for new leads
pub const SPEED_TO_LEAD_FUNCTION: &str = "run_speed_to_lead_calculation";

/// Extracts structured fields from free-text intake notes
pub const AUTO_PARSE_INTAKE_NOTES_FUNCTION: &str = "auto_parse_intake_notes";

#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job: String,
    pub result: JsonValue,
    pub duration_ms: u64,
}

pub struct JobService {
    repository: Arc<dyn Repository>,
}

impl JobService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub fn run_speed_to_lead(&self) -> Result<JobOutcome> {
        self.run(SPEED_TO_LEAD_FUNCTION, json!({}))
    }

    /// Parse intake notes, optionally for a single project
    pub fn auto_parse_intake_notes(&self, project_name: Option<&str>) -> Result<JobOutcome> {
        let params = match project_name {
            Some(name) => json!({ "project_name": name }),
            None => json!({}),
        };
        self.run(AUTO_PARSE_INTAKE_NOTES_FUNCTION, params)
    }

    fn run(&self, function: &str, params: JsonValue) -> Result<JobOutcome> {
        info!(job = function, backend = self.repository.name(), "starting job");
        let started = Instant::now();

        let result = self.repository.rpc(function, &params).map_err(|e| {
            error!(job = function, error = %e, "job failed");
            e
        })?;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(job = function, duration_ms, "job finished");

        Ok(JobOutcome {
            job: function.to_string(),
            result,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::result::Error;
    use crate::ports::{Row, SelectQuery};

    #[derive(Default)]
    struct RpcRecorder {
        calls: Mutex<Vec<(String, JsonValue)>>,
    }

    impl Repository for RpcRecorder {
        fn name(&self) -> &str {
            "rpc-recorder"
        }
        fn insert_rows(&self, _: &str, _: &[Row]) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn update_row(&self, _: &str, _: &str, _: &Row) -> Result<()> {
            Ok(())
        }
        fn delete_by_ids(&self, _: &str, _: &[String]) -> Result<usize> {
            Ok(0)
        }
        fn select(&self, _: &str, _: &SelectQuery) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
        fn count(&self, _: &str) -> Result<i64> {
            Ok(0)
        }
        fn rpc(&self, function: &str, params: &JsonValue) -> Result<JsonValue> {
            self.calls
                .lock()
                .unwrap()
                .push((function.to_string(), params.clone()));
            Ok(json!({ "processed": 4 }))
        }
    }

    #[test]
    fn test_jobs_call_their_procedures() {
        let recorder = Arc::new(RpcRecorder::default());
        let service = JobService::new(recorder.clone());

        let outcome = service.run_speed_to_lead().unwrap();
        assert_eq!(outcome.job, SPEED_TO_LEAD_FUNCTION);
        assert_eq!(outcome.result["processed"], 4);

        service.auto_parse_intake_notes(Some("North Clinic")).unwrap();
        service.auto_parse_intake_notes(None).unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0], (SPEED_TO_LEAD_FUNCTION.to_string(), json!({})));
        assert_eq!(calls[1].0, AUTO_PARSE_INTAKE_NOTES_FUNCTION);
        assert_eq!(calls[1].1, json!({ "project_name": "North Clinic" }));
        assert_eq!(calls[2].1, json!({}));
    }

    #[test]
    fn test_local_store_has_no_jobs() {
        let service = JobService::new(Arc::new(DuckDbRepository::in_memory().unwrap()));
        assert!(matches!(service.run_speed_to_lead(), Err(Error::Config(_))));
    }
}
