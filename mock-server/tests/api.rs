use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_token};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- health ---

#[tokio::test]
async fn health_reports_ok_envelope() {
    let resp = app().oneshot(get_request("/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["source"], "core");
    assert_eq!(body["meta"]["count"], 1);
}

// --- validation ---

#[tokio::test]
async fn search_without_query_returns_400_envelope() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/search", r#"{"query":"   "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "query is required");
}

#[tokio::test]
async fn get_observations_with_blank_ids_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/observations/get", r#"{"ids":[" "]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn timeline_unknown_id_returns_404() {
    let resp = app()
        .oneshot(json_request("POST", "/v1/timeline", r#"{"id":"obs_missing"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn finalize_rejects_unknown_summary_mode() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/v1/sessions/finalize",
            r#"{"session_id":"s","summary_mode":"verbose"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- auth ---

#[tokio::test]
async fn token_protected_routes_reject_missing_token() {
    let resp = app_with_token(Some("secret".to_string()))
        .oneshot(get_request("/v1/admin/consolidation/status"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn token_protected_routes_accept_bearer() {
    let req = Request::builder()
        .uri("/v1/admin/consolidation/status")
        .header(http::header::AUTHORIZATION, "Bearer secret")
        .body(String::new())
        .unwrap();
    let resp = app_with_token(Some("secret".to_string())).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_is_open_when_token_is_set() {
    let resp = app_with_token(Some("secret".to_string()))
        .oneshot(get_request("/health"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// --- full memory lifecycle ---

#[tokio::test]
async fn memory_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // checkpoint
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/checkpoints/record",
            r#"{"platform":"codex","project":"p","session_id":"s-1","title":"first","content":"alpha checkpoint content","tags":["t"],"privacy_tags":[]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let first_id = body["items"][0]["id"].as_str().unwrap().to_string();

    // event in the same session
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/events/record",
            r#"{"event":{"event_id":"e-1","platform":"codex","project":"p","session_id":"s-1","event_type":"user_prompt","payload":{"content":"beta prompt"}}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // search finds the checkpoint
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/search",
            r#"{"query":"checkpoint content","project":"p","limit":3}"#,
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["items"][0]["id"], first_id.as_str());
    assert_eq!(body["meta"]["count"], 1);

    // timeline around the checkpoint includes the event
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/timeline",
            &format!(r#"{{"id":"{first_id}","before":1,"after":1}}"#),
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["is_anchor"], true);

    // get observations carries a token estimate
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/observations/get",
            &format!(r#"{{"ids":["{first_id}"],"compact":false}}"#),
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["items"][0]["content"], "alpha checkpoint content");
    assert!(body["meta"]["token_estimate"]["estimated_total_tokens"].as_u64().unwrap() > 0);

    // finalize
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1/sessions/finalize",
            r#"{"session_id":"s-1","project":"p","summary_mode":"short"}"#,
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["items"][0]["session_id"], "s-1");
    assert_eq!(body["items"][0]["summary"], "first");

    // audit log records the finalize
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/v1/admin/audit-log?limit=5&target_type=session"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["items"][0]["action"], "session.finalize");
}
