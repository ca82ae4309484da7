use super::ApiClient;
use crate::error::Result;
use crate::types::{QueryRequest, QueryResponse};

/// Submits one SQL statement. Invalid requests fail before any network call.
///
/// The response is returned as received; an in-band `error` is left for the
/// caller to surface (see [`QueryResponse::into_result`]).
pub async fn execute_sql_query(api: &ApiClient, request: &QueryRequest) -> Result<QueryResponse> {
    request.validate()?;
    tracing::debug!(client_id = %request.client_id, "executing query");
    api.post_json("/query", &request.payload()).await
}
