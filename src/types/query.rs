use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A single ad-hoc SQL submission for one workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub client_id: String,
    pub sql: String,
    pub limit: Option<u32>,
    pub snapshot_id: Option<String>,
    /// ISO-8601 instant, forwarded verbatim.
    pub as_of_timestamp: Option<String>,
    pub estimated_scan_mb: Option<f64>,
}

impl QueryRequest {
    #[must_use]
    pub fn new(client_id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            sql: sql.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_snapshot_id(mut self, snapshot_id: impl Into<String>) -> Self {
        self.snapshot_id = Some(snapshot_id.into());
        self
    }

    #[must_use]
    pub fn with_as_of_timestamp(mut self, as_of: impl Into<String>) -> Self {
        self.as_of_timestamp = Some(as_of.into());
        self
    }

    #[must_use]
    pub fn with_estimated_scan_mb(mut self, mb: f64) -> Self {
        self.estimated_scan_mb = Some(mb);
        self
    }

    /// Checks the request can be sent at all. Time-travel parameters are not
    /// cross-checked; the backend decides which combinations it accepts.
    pub fn validate(&self) -> Result<()> {
        if self.sql.trim().is_empty() {
            return Err(Error::Validation("Enter a SQL statement to run.".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(Error::Validation("No workspace selected.".to_string()));
        }
        Ok(())
    }

    /// Outgoing body. Every field is sent under both its snake_case and
    /// camelCase name; unset options are omitted.
    #[must_use]
    pub fn payload(&self) -> QueryPayload<'_> {
        let snapshot_id = self.snapshot_id.as_deref();
        let as_of = self.as_of_timestamp.as_deref();
        QueryPayload {
            client_id: &self.client_id,
            client_id_camel: &self.client_id,
            query: &self.sql,
            sql: &self.sql,
            limit: self.limit,
            snapshot_id,
            snapshot_id_camel: snapshot_id,
            as_of_timestamp: as_of,
            as_of_timestamp_camel: as_of,
            estimated_scan_mb: self.estimated_scan_mb,
            estimated_scan_mb_camel: self.estimated_scan_mb,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryPayload<'a> {
    client_id: &'a str,
    #[serde(rename = "clientId")]
    client_id_camel: &'a str,
    query: &'a str,
    sql: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_id: Option<&'a str>,
    #[serde(rename = "snapshotId", skip_serializing_if = "Option::is_none")]
    snapshot_id_camel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    as_of_timestamp: Option<&'a str>,
    #[serde(rename = "asOfTimestamp", skip_serializing_if = "Option::is_none")]
    as_of_timestamp_camel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimated_scan_mb: Option<f64>,
    #[serde(rename = "estimatedScanMb", skip_serializing_if = "Option::is_none")]
    estimated_scan_mb_camel: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryColumn {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl QueryColumn {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data_type: None,
        }
    }
}

/// Execution metrics, normalized from whichever key spelling the backend used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStats {
    pub elapsed_ms: Option<f64>,
    pub data_scanned_mb: Option<f64>,
    pub row_count: Option<u64>,
    pub snapshot_id: Option<String>,
    pub snapshot_timestamp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryStatsWire {
    elapsed_ms: Option<f64>,
    #[serde(rename = "elapsedMs")]
    elapsed_ms_camel: Option<f64>,
    data_scanned_mb: Option<f64>,
    #[serde(rename = "dataScannedMb")]
    data_scanned_mb_camel: Option<f64>,
    row_count: Option<u64>,
    #[serde(rename = "rowCount")]
    row_count_camel: Option<u64>,
    #[serde(default, deserialize_with = "string_or_number")]
    snapshot_id: Option<String>,
    #[serde(default, rename = "snapshotId", deserialize_with = "string_or_number")]
    snapshot_id_camel: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    snapshot_timestamp: Option<String>,
    #[serde(default, rename = "snapshotTimestamp", deserialize_with = "string_or_number")]
    snapshot_timestamp_camel: Option<String>,
}

impl From<QueryStatsWire> for QueryStats {
    fn from(wire: QueryStatsWire) -> Self {
        Self {
            elapsed_ms: wire.elapsed_ms.or(wire.elapsed_ms_camel),
            data_scanned_mb: wire.data_scanned_mb.or(wire.data_scanned_mb_camel),
            row_count: wire.row_count.or(wire.row_count_camel),
            snapshot_id: wire.snapshot_id.or(wire.snapshot_id_camel),
            snapshot_timestamp: wire.snapshot_timestamp.or(wire.snapshot_timestamp_camel),
        }
    }
}

/// Snapshot ids are 64-bit integers on some backends and strings on others.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Result of one query round trip.
///
/// A present `error` means the execution failed even though it arrived with a
/// success status; `rows` and `columns` must not be rendered in that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "QueryResponseWire")]
pub struct QueryResponse {
    pub columns: Vec<QueryColumn>,
    pub rows: Vec<Value>,
    pub stats: QueryStats,
    pub statement: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponseWire {
    #[serde(default)]
    columns: Option<Vec<QueryColumn>>,
    #[serde(default)]
    rows: Option<Vec<Value>>,
    #[serde(default)]
    stats: Option<QueryStatsWire>,
    #[serde(default)]
    statement: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<QueryResponseWire> for QueryResponse {
    fn from(wire: QueryResponseWire) -> Self {
        Self {
            columns: wire.columns.unwrap_or_default(),
            rows: wire.rows.unwrap_or_default(),
            stats: wire.stats.map(QueryStats::from).unwrap_or_default(),
            statement: wire.statement,
            error: wire.error.filter(|e| !e.is_empty()),
        }
    }
}

impl QueryResponse {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Turns an in-band `error` into `Error::Application`.
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(message) => Err(Error::Application(message)),
            None => Ok(self),
        }
    }

    /// Row count from stats, falling back to the rows actually returned.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.stats.row_count.unwrap_or(self.rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_whitespace_sql_is_invalid() {
        let request = QueryRequest::new("acme", "  \n\t ");
        assert!(matches!(request.validate(), Err(Error::Validation(_))));
        assert!(QueryRequest::new("acme", "select 1").validate().is_ok());
    }

    #[test]
    fn test_payload_carries_both_aliases() {
        let request = QueryRequest::new("acme", "select 1")
            .with_limit(10)
            .with_snapshot_id("42")
            .with_as_of_timestamp("2024-01-01T00:00:00Z");
        let body = serde_json::to_value(request.payload()).unwrap();

        assert_eq!(body["client_id"], "acme");
        assert_eq!(body["clientId"], "acme");
        assert_eq!(body["query"], "select 1");
        assert_eq!(body["sql"], "select 1");
        assert_eq!(body["limit"], 10);
        assert_eq!(body["snapshot_id"], "42");
        assert_eq!(body["snapshotId"], "42");
        assert_eq!(body["as_of_timestamp"], "2024-01-01T00:00:00Z");
        assert_eq!(body["asOfTimestamp"], "2024-01-01T00:00:00Z");
        assert!(body.get("estimated_scan_mb").is_none());
        assert!(body.get("estimatedScanMb").is_none());
    }

    #[test]
    fn test_stats_aliases_normalized() {
        let response: QueryResponse = serde_json::from_value(json!({
            "columns": [{"name": "n", "type": "BIGINT"}],
            "rows": [[1], [2]],
            "stats": {
                "elapsedMs": 12.5,
                "data_scanned_mb": 3.0,
                "snapshot_id": 7_123_456_789_012_345_i64,
                "snapshotTimestamp": "2024-01-01T00:00:00Z",
                "engine": "duckdb"
            }
        }))
        .unwrap();

        assert_eq!(response.stats.elapsed_ms, Some(12.5));
        assert_eq!(response.stats.data_scanned_mb, Some(3.0));
        assert_eq!(response.stats.snapshot_id.as_deref(), Some("7123456789012345"));
        assert_eq!(
            response.stats.snapshot_timestamp.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(response.columns[0].data_type.as_deref(), Some("BIGINT"));
        assert_eq!(response.row_count(), 2);
    }

    #[test]
    fn test_snake_case_wins_over_camel_case() {
        let response: QueryResponse =
            serde_json::from_value(json!({"stats": {"row_count": 5, "rowCount": 9}})).unwrap();
        assert_eq!(response.row_count(), 5);
    }

    #[test]
    fn test_error_field_is_failure() {
        let response: QueryResponse =
            serde_json::from_value(json!({"error": "syntax error", "rows": [[1]]})).unwrap();
        assert!(response.is_failure());
        match response.into_result() {
            Err(Error::Application(message)) => assert_eq!(message, "syntax error"),
            other => panic!("expected application error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_sections_default() {
        let response: QueryResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.columns.is_empty());
        assert!(response.rows.is_empty());
        assert_eq!(response.stats, QueryStats::default());
        assert!(response.into_result().is_ok());
    }
}
