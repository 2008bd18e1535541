//! Concurrent access through one shared context
//!
//! Several threads import and undo against the same DuckDB file via a
//! single repository. Every operation must land, and undo must only ever
//! remove the rows of its own import.
//!
//! Run with: cargo test --test concurrent_import_test -- --nocapture

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;
use tempfile::TempDir;

use leaddesk_core::adapters::duckdb::DuckDbRepository;
use leaddesk_core::config::Config;
use leaddesk_core::ports::Repository;
use leaddesk_core::services::ImportRequest;
use leaddesk_core::LeaddeskContext;

/// Number of concurrent importers
const THREAD_COUNT: usize = 6;

/// Rows per uploaded file
const ROWS_PER_FILE: usize = 5;

fn csv_for(thread_id: usize) -> String {
    let mut csv = String::from("date_appointment_created,project_name,lead_name\n");
    for i in 0..ROWS_PER_FILE {
        csv.push_str(&format!("2024-06-01,Clinic {},Lead {}-{}\n", thread_id, thread_id, i));
    }
    csv
}

#[test]
fn test_concurrent_imports_all_land() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DuckDbRepository::new(&temp_dir.path().join("concurrent.duckdb")).unwrap();
    repo.ensure_schema().unwrap();
    let repo = Arc::new(repo);
    let ctx = Arc::new(LeaddeskContext::with_repository(Config::default(), repo.clone()));

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let ctx = Arc::clone(&ctx);

        handles.push(thread::spawn(move || {
            barrier.wait();
            let start = Instant::now();
            let result = ctx
                .import_service
                .import_appointments(ImportRequest {
                    file_name: format!("thread_{}.csv", thread_id),
                    content: csv_for(thread_id),
                    imported_by: Some(format!("worker-{}", thread_id)),
                    preview: false,
                })
                .unwrap();
            println!("Thread {}: imported {} rows in {:?}", thread_id, result.imported, start.elapsed());
            result
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(
        repo.count("all_appointments").unwrap() as usize,
        THREAD_COUNT * ROWS_PER_FILE
    );
    assert_eq!(ctx.tracker.count().unwrap() as usize, THREAD_COUNT);
    for result in &results {
        assert_eq!(result.imported, ROWS_PER_FILE);
        assert!(result.import_id.is_some());
    }
}

#[test]
fn test_concurrent_undo_only_removes_own_rows() {
    let temp_dir = TempDir::new().unwrap();
    let repo = DuckDbRepository::new(&temp_dir.path().join("undo.duckdb")).unwrap();
    repo.ensure_schema().unwrap();
    let repo = Arc::new(repo);
    let ctx = Arc::new(LeaddeskContext::with_repository(Config::default(), repo.clone()));

    let import_ids: Vec<String> = (0..THREAD_COUNT)
        .map(|thread_id| {
            ctx.import_service
                .import_appointments(ImportRequest {
                    file_name: format!("batch_{}.csv", thread_id),
                    content: csv_for(thread_id),
                    imported_by: None,
                    preview: false,
                })
                .unwrap()
                .import_id
                .unwrap()
        })
        .collect();

    // Undo every other import in parallel
    let barrier = Arc::new(Barrier::new(THREAD_COUNT / 2));
    let handles: Vec<_> = import_ids
        .iter()
        .step_by(2)
        .cloned()
        .map(|import_id| {
            let barrier = Arc::clone(&barrier);
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                barrier.wait();
                ctx.undo_service.undo_by_id(&import_id).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let undo = handle.join().unwrap();
        assert_eq!(undo.deleted, ROWS_PER_FILE);
    }

    assert_eq!(
        repo.count("all_appointments").unwrap() as usize,
        (THREAD_COUNT / 2) * ROWS_PER_FILE
    );
    for (i, import_id) in import_ids.iter().enumerate() {
        let record = ctx.tracker.get_import(import_id).unwrap().unwrap();
        assert_eq!(record.is_undone(), i % 2 == 0);
    }
}

/// Opening and closing the same file repeatedly keeps schema and data
#[test]
fn test_sequential_connections() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sequential.duckdb");

    for i in 0..5 {
        let start = Instant::now();
        let repo = DuckDbRepository::new(&db_path).unwrap();
        repo.ensure_schema().unwrap();

        let mut row = serde_json::Map::new();
        row.insert("project_name".into(), "Clinic".into());
        repo.insert_rows("new_leads", &[row]).unwrap();

        assert_eq!(repo.count("new_leads").unwrap(), i + 1);
        println!("Connection {}: opened in {:?}", i, start.elapsed());
    }
}
