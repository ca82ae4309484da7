//! HTTP gateway tests against a mock API server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use shoreline::api::{
    ApiClient, CheckoutSessionRequest, PortalSessionRequest, QueryHistoryParams, RequestOptions,
    create_checkout_session, create_portal_session, execute_sql_query, fetch_plan_catalog,
    fetch_query_history, fetch_usage_history,
};
use shoreline::auth::LocalIdentity;
use shoreline::console::{QueryEditor, ViewCache, ViewKey};
use shoreline::error::Error;
use shoreline::types::{Principal, QueryRequest};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    let identity = Arc::new(LocalIdentity::signed_in(Principal::new("user-1"), "tok-123"));
    ApiClient::new(server.uri(), Duration::from_secs(5), identity).expect("client")
}

fn signed_out_client(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri(), Duration::from_secs(5), Arc::new(LocalIdentity::signed_out()))
        .expect("client")
}

#[tokio::test]
async fn test_sends_bearer_token_and_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let body: Value = client(&server).get_json("/ping").await.unwrap();
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_signed_out_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = signed_out_client(&server).get_json::<Value>("/ping").await;
    assert!(matches!(result, Err(Error::AuthenticationRequired)));
}

#[tokio::test]
async fn test_no_content_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/touch"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result: Option<Value> = client(&server)
        .request("/touch", RequestOptions::post())
        .await
        .unwrap();
    assert!(result.is_none());

    let fetched = client(&server)
        .fetch::<Value>("/touch", RequestOptions::post())
        .await;
    assert!(matches!(fetched, Err(Error::EmptyResponse)));
}

#[tokio::test]
async fn test_error_status_carries_body_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/denied"))
        .respond_with(ResponseTemplate::new(403).set_body_string("workspace suspended"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let api = client(&server);
    match api.get_json::<Value>("/denied").await {
        Err(Error::Transport { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "workspace suspended");
        }
        other => panic!("unexpected {other:?}"),
    }
    match api.get_json::<Value>("/broken").await {
        Err(e @ Error::Transport { .. }) => {
            assert_eq!(e.to_string(), "Request failed with status 502");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_json_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let result = client(&server).get_json::<Value>("/garbled").await;
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[tokio::test]
async fn test_query_payload_uses_both_spellings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "client_id": "acme",
            "clientId": "acme",
            "query": "select 1",
            "sql": "select 1",
            "snapshot_id": "42",
            "snapshotId": "42",
            "limit": 10,
            "estimated_scan_mb": 12.5,
            "estimatedScanMb": 12.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "columns": [{"name": "n"}],
            "rows": [[1]],
            "stats": {"elapsedMs": 250, "rowCount": 1, "snapshotId": 42}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = QueryRequest::new("acme", "select 1")
        .with_limit(10)
        .with_snapshot_id("42")
        .with_estimated_scan_mb(12.5);
    let response = execute_sql_query(&client(&server), &request).await.unwrap();
    assert_eq!(response.row_count(), 1);
    assert_eq!(response.stats.elapsed_ms, Some(250.0));
    assert_eq!(response.stats.snapshot_id.as_deref(), Some("42"));

    let received: Vec<Request> = server.received_requests().await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("as_of_timestamp").is_none());
    assert!(body.get("asOfTimestamp").is_none());
}

#[tokio::test]
async fn test_in_band_query_error_becomes_application_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Table not found: events"
        })))
        .mount(&server)
        .await;

    let response = execute_sql_query(&client(&server), &QueryRequest::new("acme", "select *"))
        .await
        .unwrap();
    assert!(response.is_failure());
    match response.into_result() {
        Err(Error::Application(message)) => assert_eq!(message, "Table not found: events"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_query_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = execute_sql_query(&client(&server), &QueryRequest::new("acme", "  ")).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_usage_history_days_param() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/clients/acme%20co/usage/history"))
        .and(query_param("days", "14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "history": [
                {"date": "2024-01-02", "queries": 3, "scan_mb": 2},
                {"date": "2024-01-01", "queries": 1, "scan_mb": 1}
            ]
        })))
        .mount(&server)
        .await;

    let history = fetch_usage_history(&client(&server), "acme co", 14).await.unwrap();
    assert_eq!(history.points[0].date, "2024-01-01");
    assert_eq!(history.summary().total_queries, 4.0);
}

#[tokio::test]
async fn test_query_history_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/clients/acme/query-history"))
        .and(query_param("table", "events"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [],
            "summary": {"totalQueries": 0, "failedQueries": 0, "totalCostUsd": 0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = QueryHistoryParams {
        table: Some("events".into()),
        limit: Some(5),
        ..QueryHistoryParams::default()
    };
    let history = fetch_query_history(&client(&server), "acme", &params)
        .await
        .unwrap();
    assert!(history.entries.is_empty());
}

#[tokio::test]
async fn test_billing_calls_work_signed_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/billing/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pro": "Pro",
            "starter": "Starter"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/billing/checkout-session"))
        .and(body_partial_json(json!({"clientId": "acme", "planId": "pro"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cs_1"})))
        .mount(&server)
        .await;

    let api = signed_out_client(&server);
    let catalog = fetch_plan_catalog(&api).await.unwrap();
    assert_eq!(catalog.get("pro").map(String::as_str), Some("Pro"));

    let request = CheckoutSessionRequest {
        client_id: "acme".into(),
        plan_id: "pro".into(),
        success_url: "https://app/success".into(),
        cancel_url: "https://app/cancel".into(),
        customer_id: None,
    };
    let redirect = create_checkout_session(&api, &request).await.unwrap();
    assert_eq!(redirect.to_string(), "checkout session cs_1");

    let sent = server.received_requests().await.unwrap_or_default();
    assert!(sent.iter().all(|r| !r.headers.contains_key("authorization")));
}

#[tokio::test]
async fn test_portal_failure_is_prefixed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/billing/portal-session"))
        .respond_with(ResponseTemplate::new(400).set_body_string("no such customer"))
        .mount(&server)
        .await;

    let request = PortalSessionRequest {
        customer_id: "cus_9".into(),
        return_url: "https://app/billing".into(),
    };
    let err = create_portal_session(&client(&server), &request)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to create billing portal session: no such customer"
    );
}

#[tokio::test]
async fn test_editor_keeps_result_on_failure_and_stales_activity_views() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "columns": [{"name": "n"}],
            "rows": [[1], [2]]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("engine unavailable"))
        .mount(&server)
        .await;

    let cache = Arc::new(ViewCache::new());
    let usage = ViewKey::UsageHistory("acme".into());
    let history = ViewKey::QueryHistory("acme".into());
    let other = ViewKey::UsageHistory("globex".into());
    for key in [&usage, &history, &other] {
        cache
            .get_or_fetch(key.clone(), || async { Ok(0_u32) })
            .await
            .unwrap();
    }

    let mut editor = QueryEditor::new(client(&server), Arc::clone(&cache), "acme");
    editor.set_sql("select n from t");
    assert!(editor.run().await);
    assert!(editor.error().is_none());
    assert!(!cache.is_fresh(&usage));
    assert!(!cache.is_fresh(&history));
    assert!(cache.is_fresh(&other));

    let first = editor.result().cloned().expect("first result");
    assert_eq!(first.rows.len(), 2);

    editor.set_sql("select n from t where n > 1");
    assert!(!editor.run().await);
    assert_eq!(editor.error(), Some("engine unavailable"));
    assert_eq!(editor.result(), Some(&first));
}

#[tokio::test]
async fn test_editor_in_band_error_keeps_previous_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": [{"x": 1}]})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "syntax error"})))
        .mount(&server)
        .await;

    let cache = Arc::new(ViewCache::new());
    let mut editor = QueryEditor::new(client(&server), Arc::clone(&cache), "acme");
    editor.set_sql("select 1 as x");
    assert!(editor.run().await);
    let first = editor.result().cloned().expect("first result");

    cache
        .get_or_fetch(ViewKey::QueryHistory("acme".into()), || async { Ok(0_u32) })
        .await
        .unwrap();
    editor.set_sql("selec 1");
    assert!(!editor.run().await);
    assert_eq!(editor.error(), Some("syntax error"));
    assert_eq!(editor.result(), Some(&first));
    assert!(cache.is_fresh(&ViewKey::QueryHistory("acme".into())));
}
