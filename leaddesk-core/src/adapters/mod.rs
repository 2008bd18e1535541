//! Adapter implementations
//!
//! Adapters implement the `Repository` port:
//! - DuckDB for the local store
//! - PostgREST-style HTTP client for the hosted backend

pub mod duckdb;
pub mod rest;
