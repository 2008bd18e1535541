//! Hosted backend client
//!
//! Talks to a PostgREST-compatible API (`/rest/v1/{table}` and
//! `/rest/v1/rpc/{function}`) with an API key.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::{validate_identifier, Repository, Row, SelectQuery};

/// Request timeout for every backend call
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Repository backed by the hosted REST API
#[derive(Debug)]
pub struct RestRepository {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl RestRepository {
    /// Create a client for the project at `api_url`
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let parsed = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("Invalid backend URL: {}", e)))?;

        if parsed.scheme() != "https" && !is_loopback(&parsed) {
            return Err(Error::Config("Backend URL must use HTTPS".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Config("Backend API key is empty".to_string()));
        }

        let base_url = parsed
            .join("rest/v1/")
            .map_err(|e| Error::Config(format!("Invalid backend URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        validate_identifier(table)?;
        self.base_url
            .join(table)
            .map_err(|e| Error::Config(format!("Invalid table URL: {}", e)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Http(format!(
                "Connection timed out after {} seconds",
                REQUEST_TIMEOUT_SECS
            ))
        } else if error.is_connect() {
            Error::Http("Unable to connect to the backend".to_string())
        } else {
            Error::Http(error.to_string())
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|e| self.map_request_error(e))?;
        check_response_status(response)
    }

    fn into_rows(value: JsonValue) -> Result<Vec<Row>> {
        match value {
            JsonValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    JsonValue::Object(map) => Ok(map),
                    other => Err(Error::Http(format!("Unexpected row in response: {}", other))),
                })
                .collect(),
            other => Err(Error::Http(format!("Expected a JSON array, got: {}", other))),
        }
    }
}

/// Check response status and turn failures into errors carrying the body
fn check_response_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(Error::Http(format!(
            "Backend rejected the API key (HTTP {}): {}",
            status.as_u16(),
            body
        ))),
        404 => Err(Error::NotFound(format!("Backend resource: {}", body))),
        code => Err(Error::Http(format!("Backend error: HTTP {}: {}", code, body))),
    }
}

fn is_loopback(url: &Url) -> bool {
    matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
}

/// Render a filter value the way PostgREST expects it in a query string
fn filter_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `in.(a,b)` list; values containing reserved characters are double-quoted
fn in_list(ids: &[String]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| {
            if id.contains([',', '(', ')', '"']) {
                format!("\"{}\"", id.replace('"', "\\\""))
            } else {
                id.clone()
            }
        })
        .collect();
    format!("in.({})", items.join(","))
}

/// Total from a `Content-Range: 0-24/3573` header
fn parse_content_range_total(header: &str) -> Option<i64> {
    header.rsplit_once('/').and_then(|(_, total)| total.parse().ok())
}

impl Repository for RestRepository {
    fn name(&self) -> &str {
        "rest"
    }

    fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<Vec<String>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.table_url(table)?;
        debug!(table, rows = rows.len(), "inserting rows");

        let response = self.send(
            self.client
                .post(url)
                .header("Prefer", "return=representation")
                .json(rows),
        )?;
        let inserted = Self::into_rows(response.json()?)?;

        inserted
            .iter()
            .map(|row| match row.get("id") {
                Some(JsonValue::String(id)) => Ok(id.clone()),
                Some(JsonValue::Number(n)) => Ok(n.to_string()),
                _ => Err(Error::Http(format!("Inserted {} row has no id", table))),
            })
            .collect()
    }

    fn update_row(&self, table: &str, id: &str, patch: &Row) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));

        let response = self.send(
            self.client
                .patch(url)
                .header("Prefer", "return=representation")
                .json(patch),
        )?;
        let updated = Self::into_rows(response.json()?)?;
        if updated.is_empty() {
            return Err(Error::not_found(format!("{} row {}", table, id)));
        }
        Ok(())
    }

    fn delete_by_ids(&self, table: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &in_list(ids));
        debug!(table, ids = ids.len(), "deleting rows");

        let response = self.send(
            self.client
                .delete(url)
                .header("Prefer", "return=representation"),
        )?;
        let deleted = Self::into_rows(response.json()?)?;
        Ok(deleted.len())
    }

    fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Row>> {
        let mut url = self.table_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (column, value) in &query.filters {
                validate_identifier(column)?;
                if value.is_null() {
                    pairs.append_pair(column, "is.null");
                } else {
                    pairs.append_pair(column, &format!("eq.{}", filter_literal(value)));
                }
            }
            if let Some(order) = &query.order_by {
                validate_identifier(&order.column)?;
                let direction = if order.descending { "desc" } else { "asc" };
                pairs.append_pair("order", &format!("{}.{}.nullslast", order.column, direction));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        let response = self.send(self.client.get(url))?;
        Self::into_rows(response.json()?)
    }

    fn count(&self, table: &str) -> Result<i64> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("select", "id");

        let response = self.send(
            self.client
                .head(url)
                .header("Prefer", "count=exact")
                .header("Range", "0-0"),
        )?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| Error::Http(format!("No row count returned for {}", table)))
    }

    fn rpc(&self, function: &str, params: &JsonValue) -> Result<JsonValue> {
        validate_identifier(function)?;
        let url = self
            .base_url
            .join(&format!("rpc/{}", function))
            .map_err(|e| Error::Config(format!("Invalid procedure URL: {}", e)))?;
        debug!(function, "calling procedure");

        let response = self.send(self.client.post(url).json(params))?;
        let body = response.text()?;
        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
