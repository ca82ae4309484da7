use super::ApiClient;
use crate::error::Result;
use crate::types::QueryHistory;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryHistoryParams {
    /// ISO-8601 instants bounding `submitted_at`.
    pub start: Option<String>,
    pub end: Option<String>,
    pub table: Option<String>,
    pub limit: Option<u32>,
}

impl QueryHistoryParams {
    fn query_string(&self) -> String {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<&str>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                pairs.push(format!("{key}={}", urlencoding::encode(value)));
            }
        };
        push("start", self.start.as_deref());
        push("end", self.end.as_deref());
        push("table", self.table.as_deref());
        let limit = self.limit.filter(|l| *l > 0).map(|l| l.to_string());
        push("limit", limit.as_deref());
        pairs.join("&")
    }
}

pub async fn fetch_query_history(
    api: &ApiClient,
    client_id: &str,
    params: &QueryHistoryParams,
) -> Result<QueryHistory> {
    let mut path = format!("/api/clients/{}/query-history", urlencoding::encode(client_id));
    let query = params.query_string();
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query);
    }
    api.get_json(&path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_only_set_params() {
        assert_eq!(QueryHistoryParams::default().query_string(), "");

        let params = QueryHistoryParams {
            start: Some("2024-05-01T00:00:00Z".into()),
            table: Some(String::new()),
            limit: Some(25),
            ..QueryHistoryParams::default()
        };
        assert_eq!(
            params.query_string(),
            "start=2024-05-01T00%3A00%3A00Z&limit=25"
        );
    }
}
