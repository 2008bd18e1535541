//! Repository port - backing store abstraction

use serde_json::Value as JsonValue;

use crate::domain::result::Result;

/// One row as a column → value map
pub type Row = serde_json::Map<String, JsonValue>;

/// Equality filter, ordering and limit for [`Repository::select`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub filters: Vec<(String, JsonValue)>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows where `column = value`
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            descending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Generic table access plus named remote procedures
///
/// Every table has a text `id` primary key. Implementations assign ids to
/// inserted rows that lack one and return them in input order.
pub trait Repository: Send + Sync {
    /// Short backend name for logs and status output
    fn name(&self) -> &str;

    /// Insert rows as one batch; all rows are written or none are
    fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<Vec<String>>;

    /// Patch the row with the given id
    fn update_row(&self, table: &str, id: &str, patch: &Row) -> Result<()>;

    /// Delete every row whose id is in `ids` in one statement.
    /// Returns the number of rows the store reports as deleted.
    fn delete_by_ids(&self, table: &str, ids: &[String]) -> Result<usize>;

    /// Read rows matching the query
    fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>>;

    /// Count rows in a table
    fn count(&self, table: &str) -> Result<i64>;

    /// Call a named server-side procedure
    fn rpc(&self, function: &str, params: &JsonValue) -> Result<JsonValue>;
}

/// Reject anything that is not a plain SQL/REST identifier
pub fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(crate::domain::result::Error::validation(format!(
            "invalid identifier: {:?}",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_query_builder() {
        let query = SelectQuery::new()
            .eq("import_type", "leads")
            .order_desc("imported_at")
            .limit(5);
        assert_eq!(query.filters, vec![("import_type".to_string(), JsonValue::from("leads"))]);
        assert!(query.order_by.as_ref().unwrap().descending);
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("all_appointments").is_ok());
        assert!(validate_identifier("new_leads2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1table").is_err());
        assert!(validate_identifier("leads; DROP TABLE x").is_err());
        assert!(validate_identifier("\"quoted\"").is_err());
    }
}
