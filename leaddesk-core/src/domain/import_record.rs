//! Import audit records

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use super::import_type::ImportType;

/// Who an import is attributed to when the caller does not say
pub const DEFAULT_IMPORTED_BY: &str = "System";

/// Table that holds one row per import attempt
pub const IMPORT_HISTORY_TABLE: &str = "csv_import_history";

/// Input for recording one finished import
#[derive(Debug, Clone)]
pub struct ImportTrackingData {
    pub import_type: ImportType,
    pub file_name: String,
    pub records_imported: u64,
    pub records_failed: u64,
    pub imported_record_ids: Vec<String>,
    pub import_summary: Option<serde_json::Map<String, JsonValue>>,
    pub imported_by: Option<String>,
}

/// A persisted import attempt
///
/// Written once by the tracker; the only later change is `undone_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: String,
    /// Kept as text: older rows may carry types this build does not know
    pub import_type: String,
    pub file_name: String,
    pub records_imported: i64,
    pub records_failed: i64,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub imported_record_ids: Vec<String>,
    #[serde(default)]
    pub import_summary: Option<JsonValue>,
    #[serde(default = "default_imported_by", deserialize_with = "deserialize_imported_by")]
    pub imported_by: String,
    #[serde(default, deserialize_with = "deserialize_store_timestamp")]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_store_timestamp")]
    pub undone_at: Option<DateTime<Utc>>,
}

impl ImportRecord {
    pub fn is_undone(&self) -> bool {
        self.undone_at.is_some()
    }
}

/// Parse a timestamp as produced by either backing store.
///
/// The hosted store returns RFC 3339; DuckDB renders `TIMESTAMP` columns
/// as `YYYY-MM-DD HH:MM:SS[.ffffff]` in UTC.
pub fn parse_store_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a timestamp in the form both stores accept for `TIMESTAMP` columns
pub fn format_store_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn default_imported_by() -> String {
    DEFAULT_IMPORTED_BY.to_string()
}

fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_imported_by<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(default_imported_by))
}

fn deserialize_store_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_store_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339_and_duckdb_formats() {
        let hosted = parse_store_timestamp("2024-03-01T10:15:30.250+00:00").unwrap();
        let local = parse_store_timestamp("2024-03-01 10:15:30.25").unwrap();
        assert_eq!(hosted, local);

        let whole_seconds = parse_store_timestamp("2024-03-01 10:15:30").unwrap();
        assert_eq!(whole_seconds.second(), 30);
        assert!(parse_store_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let now = Utc::now();
        let parsed = parse_store_timestamp(&format_store_timestamp(&now)).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_deserialize_store_row() {
        let row = serde_json::json!({
            "id": "imp-1",
            "import_type": "leads",
            "file_name": "leads.csv",
            "records_imported": 2,
            "records_failed": 0,
            "imported_record_ids": ["a", "b"],
            "import_summary": {"total_rows": 2},
            "imported_by": "System",
            "imported_at": "2024-03-01 10:15:30",
            "undone_at": null
        });
        let record: ImportRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.imported_record_ids, vec!["a", "b"]);
        assert_eq!(record.imported_at.unwrap().year(), 2024);
        assert!(!record.is_undone());
    }

    #[test]
    fn test_missing_optional_columns_default() {
        let row = serde_json::json!({
            "id": "imp-2",
            "import_type": "calls",
            "file_name": "calls.csv",
            "records_imported": 0,
            "records_failed": 3,
            "imported_by": "ops@clinic"
        });
        let record: ImportRecord = serde_json::from_value(row).unwrap();
        assert!(record.imported_record_ids.is_empty());
        assert!(record.imported_at.is_none());
        assert!(record.undone_at.is_none());
    }

    #[test]
    fn test_null_columns_from_hosted_store() {
        let row = serde_json::json!({
            "id": "imp-3",
            "import_type": "appointments",
            "file_name": "appointments.csv",
            "records_imported": 0,
            "records_failed": 1,
            "imported_record_ids": null,
            "import_summary": null,
            "imported_by": null,
            "imported_at": "2024-03-01T10:15:30+00:00",
            "undone_at": null
        });
        let record: ImportRecord = serde_json::from_value(row).unwrap();
        assert!(record.imported_record_ids.is_empty());
        assert!(record.import_summary.is_none());
        assert_eq!(record.imported_by, DEFAULT_IMPORTED_BY);
    }

    #[test]
    fn test_missing_imported_by_defaults_to_system() {
        let row = serde_json::json!({
            "id": "imp-4",
            "import_type": "leads",
            "file_name": "leads.csv",
            "records_imported": 1,
            "records_failed": 0
        });
        let record: ImportRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.imported_by, "System");
    }
}
