use std::sync::Arc;

use super::ViewCache;
use crate::api::{ApiClient, execute_sql_query};
use crate::render::{ResultTable, format_decimal, format_integer};
use crate::types::{QueryRequest, QueryResponse};

pub const DEFAULT_QUERY: &str = "-- Explore recent queries executed through the API
SELECT *
FROM iceberg.system.query_history
ORDER BY query_start DESC
LIMIT 50;";

/// Interactive SQL editor bound to one workspace.
///
/// Holds the draft statement, optional time-travel inputs, the last error and
/// the last successful result. A failed run records its message and leaves the
/// previously displayed result in place.
pub struct QueryEditor {
    api: ApiClient,
    cache: Arc<ViewCache>,
    client_id: String,
    sql: String,
    snapshot_id: String,
    as_of_timestamp: String,
    limit: Option<u32>,
    error: Option<String>,
    result: Option<QueryResponse>,
}

impl QueryEditor {
    pub fn new(api: ApiClient, cache: Arc<ViewCache>, client_id: impl Into<String>) -> Self {
        Self {
            api,
            cache,
            client_id: client_id.into(),
            sql: DEFAULT_QUERY.to_string(),
            snapshot_id: String::new(),
            as_of_timestamp: String::new(),
            limit: None,
            error: None,
            result: None,
        }
    }

    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql = sql.into();
    }

    pub fn reset_sql(&mut self) {
        self.sql = DEFAULT_QUERY.to_string();
    }

    pub fn set_snapshot_id(&mut self, snapshot_id: impl Into<String>) {
        self.snapshot_id = snapshot_id.into();
    }

    pub fn set_as_of_timestamp(&mut self, as_of: impl Into<String>) {
        self.as_of_timestamp = as_of.into();
    }

    pub fn set_limit(&mut self, limit: Option<u32>) {
        self.limit = limit;
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&QueryResponse> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn table(&self) -> Option<ResultTable> {
        self.result.as_ref().map(ResultTable::from)
    }

    /// The request the current inputs describe. Blank time-travel inputs are
    /// left out.
    #[must_use]
    pub fn request(&self) -> QueryRequest {
        let mut request = QueryRequest::new(&self.client_id, &self.sql);
        request.limit = self.limit;
        request.snapshot_id = non_blank(&self.snapshot_id);
        request.as_of_timestamp = non_blank(&self.as_of_timestamp);
        request
    }

    /// Runs the current statement. Returns `true` when a result was accepted;
    /// otherwise the reason is in [`error`](Self::error).
    pub async fn run(&mut self) -> bool {
        self.error = None;
        let request = self.request();

        let outcome = match execute_sql_query(&self.api, &request).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => {
                self.cache.invalidate_workspace_activity(&self.client_id);
                self.result = Some(response);
                true
            }
            Err(e) => {
                tracing::debug!(client_id = %self.client_id, error = %e, "query failed");
                self.error = Some(e.to_string());
                false
            }
        }
    }

    /// One-line summary of the last result's statistics, e.g.
    /// `Elapsed: 0.25s  Data scanned: 12.5 MB  Rows: 1,200`.
    #[must_use]
    pub fn stats_line(&self) -> Option<String> {
        let result = self.result.as_ref()?;
        let stats = &result.stats;
        let mut parts = Vec::new();
        if let Some(ms) = stats.elapsed_ms {
            parts.push(format!("Elapsed: {}s", format_decimal(ms / 1000.0, 2)));
        }
        if let Some(mb) = stats.data_scanned_mb {
            parts.push(format!("Data scanned: {} MB", format_decimal(mb, 2)));
        }
        parts.push(format!("Rows: {}", format_integer(result.row_count() as f64)));
        if let Some(snapshot) = &stats.snapshot_id {
            parts.push(format!("Snapshot: {snapshot}"));
        }
        if let Some(at) = &stats.snapshot_timestamp {
            parts.push(format!("Snapshot time: {at}"));
        }
        Some(parts.join("  "))
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::LocalIdentity;
    use crate::types::Principal;

    fn editor() -> QueryEditor {
        let identity = Arc::new(LocalIdentity::signed_in(Principal::new("u1"), "tok"));
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), identity).unwrap();
        QueryEditor::new(api, Arc::new(ViewCache::new()), "acme")
    }

    #[test]
    fn test_starts_with_sample_query() {
        let mut editor = editor();
        assert_eq!(editor.sql(), DEFAULT_QUERY);
        editor.set_sql("select 1");
        editor.reset_sql();
        assert_eq!(editor.sql(), DEFAULT_QUERY);
    }

    #[test]
    fn test_request_drops_blank_time_travel() {
        let mut editor = editor();
        editor.set_sql("select 1");
        editor.set_snapshot_id("   ");
        editor.set_as_of_timestamp(" 2024-05-01T00:00:00Z ");
        let request = editor.request();
        assert_eq!(request.snapshot_id, None);
        assert_eq!(request.as_of_timestamp.as_deref(), Some("2024-05-01T00:00:00Z"));
        assert_eq!(request.client_id, "acme");
    }

    #[tokio::test]
    async fn test_blank_sql_is_recorded_without_request() {
        let mut editor = editor();
        editor.set_sql(" \n ");
        assert!(!editor.run().await);
        assert_eq!(editor.error(), Some("Enter a SQL statement to run."));
        assert!(editor.result().is_none());
        assert!(editor.stats_line().is_none());
    }
}
