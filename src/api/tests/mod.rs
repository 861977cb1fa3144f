use super::*;
use crate::processor::test_helpers::{ScriptedGenerator, create_test_processor};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

/// Router over a fresh processor; the worker is not started
async fn test_app() -> (Router, Arc<BatchProcessor>, tempfile::TempDir) {
    let (processor, _generator, temp_dir) =
        create_test_processor(ScriptedGenerator::default()).await;
    let processor = Arc::new(processor);
    let app = create_router(processor.clone(), processor.get_config());
    (app, processor, temp_dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Create a batch for `owner` through the API and return its id
async fn create(app: &Router, owner: &str, topics: &[&str]) -> String {
    let items: Vec<Value> = topics.iter().map(|t| json!({ "topic": t })).collect();
    let (status, body) = send(
        app,
        post_json(
            "/batches",
            json!({ "owner": owner, "name": "Spring posts", "items": items }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["batch_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _processor, _temp_dir) = test_app().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (app, _processor, _temp_dir) = test_app().await;

    let (status, body) = send(&app, get("/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "article-batch REST API");
    assert!(body["paths"]["/batches/{batch_id}/cancel"].is_object());
}

#[tokio::test]
async fn test_create_batch_returns_created() {
    let (app, _processor, _temp_dir) = test_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/batches",
            json!({
                "owner": "alice",
                "name": "Spring posts",
                "items": [
                    { "topic": "Composting", "tone": "casual", "word_count": 800 },
                    { "topic": "Seed saving" }
                ]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["batch_id"].as_str().unwrap().starts_with("batch_"));
    assert_eq!(body["status"], "pending");
    assert_eq!(body["total_items"], 2);
}

#[tokio::test]
async fn test_create_batch_rejects_invalid_requests() {
    let (app, processor, _temp_dir) = test_app().await;

    let (status, body) = send(
        &app,
        post_json("/batches", json!({ "name": "Empty", "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = send(
        &app,
        post_json(
            "/batches",
            json!({ "name": "Blank topic", "items": [{ "topic": "  " }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    // Malformed JSON goes through the same error shape
    let request = Request::builder()
        .method("POST")
        .uri("/batches")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    assert!(
        processor
            .list_batches("default_user", None, 0, 20)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_create_batch_rejects_unknown_tone() {
    let (app, processor, _temp_dir) = test_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/batches",
            json!({
                "name": "Spring posts",
                "items": [{ "topic": "Composting", "tone": "friendly" }]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(
        processor
            .list_batches("default_user", None, 0, 20)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_get_batch_status_and_owner_checks() {
    let (app, _processor, _temp_dir) = test_app().await;
    let batch_id = create(&app, "alice", &["a", "b"]).await;

    let (status, body) = send(&app, get(&format!("/batches/{batch_id}?owner=alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["total_items"], 2);
    assert_eq!(body["progress_percentage"], 0.0);
    assert_eq!(body["is_complete"], false);
    assert_eq!(body["items"][0]["topic"], "a");
    assert_eq!(body["items"][1]["status"], "queued");

    let (status, body) = send(&app, get(&format!("/batches/{batch_id}?owner=bob"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, body) = send(&app, get("/batches/batch_missing?owner=alice")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "batch_not_found");
    assert_eq!(body["error"]["details"]["batch_id"], "batch_missing");
}

#[tokio::test]
async fn test_default_owner_applies_when_omitted() {
    let (app, _processor, _temp_dir) = test_app().await;
    let batch_id = create(&app, "default_user", &["a"]).await;

    let (status, _body) = send(&app, get(&format!("/batches/{batch_id}"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cancel_then_cancel_again_conflicts() {
    let (app, _processor, _temp_dir) = test_app().await;
    let batch_id = create(&app, "alice", &["a", "b", "c"]).await;

    let uri = format!("/batches/{batch_id}/cancel?owner=alice");
    let (status, body) = send(&app, post_empty(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["batch_id"], batch_id.as_str());
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["skipped_items"], 3);

    let (status, body) = send(&app, post_empty(&uri)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_state");
    assert_eq!(body["error"]["details"]["current_state"], "cancelled");

    let (status, _body) = send(
        &app,
        post_empty(&format!("/batches/{batch_id}/cancel?owner=bob")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_batches_with_filter_and_paging() {
    let (app, _processor, _temp_dir) = test_app().await;
    let first = create(&app, "alice", &["a"]).await;
    let second = create(&app, "alice", &["b"]).await;
    create(&app, "bob", &["c"]).await;
    send(
        &app,
        post_empty(&format!("/batches/{first}/cancel?owner=alice")),
    )
    .await;

    let (status, body) = send(&app, get("/batches?owner=alice")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["batch_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let (status, body) = send(&app, get("/batches?owner=alice&status=cancelled")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["batch_id"], first.as_str());

    let (status, body) = send(&app, get("/batches?owner=alice&offset=1&limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["batch_id"], first.as_str());

    let (status, body) = send(&app, get("/batches?owner=alice&status=paused")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _body) = send(&app, get("/batches?owner=alice&limit=0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_batch_logs_endpoint() {
    let (app, _processor, _temp_dir) = test_app().await;
    let batch_id = create(&app, "alice", &["a", "b"]).await;
    send(
        &app,
        post_empty(&format!("/batches/{batch_id}/cancel?owner=alice")),
    )
    .await;

    let (status, body) = send(&app, get(&format!("/batches/{batch_id}/logs?owner=alice"))).await;
    assert_eq!(status, StatusCode::OK);
    let logs = body.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["level"], "WARNING");
    assert_eq!(logs[1]["message"], "Batch created with 2 articles");

    let (status, body) = send(
        &app,
        get(&format!("/batches/{batch_id}/logs?owner=alice&limit=1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _body) = send(
        &app,
        get(&format!("/batches/{batch_id}/logs?owner=alice&limit=5000")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_stream_of_finished_batch_ends_after_one_event() {
    let (app, _processor, _temp_dir) = test_app().await;
    let batch_id = create(&app, "alice", &["a"]).await;
    send(
        &app,
        post_empty(&format!("/batches/{batch_id}/cancel?owner=alice")),
    )
    .await;

    let response = app
        .clone()
        .oneshot(get(&format!("/batches/{batch_id}/stream?owner=alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let bytes = tokio::time::timeout(
        Duration::from_secs(5),
        axum::body::to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .unwrap()
    .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.matches("event: status").count(), 1, "{text}");
    assert!(text.contains("\"is_complete\":true"), "{text}");
}

#[tokio::test]
async fn test_stream_of_unknown_batch_reports_error() {
    let (app, _processor, _temp_dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(get("/batches/batch_missing/stream?owner=alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = tokio::time::timeout(
        Duration::from_secs(5),
        axum::body::to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .unwrap()
    .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: error"), "{text}");
    assert!(text.contains("not_found"), "{text}");
}

#[tokio::test]
async fn test_shutdown_endpoint_stops_intake() {
    let (app, processor, _temp_dir) = test_app().await;

    let (status, body) = send(&app, post_empty("/shutdown")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "shutdown initiated");

    tokio::time::timeout(Duration::from_secs(5), processor.shutdown_requested())
        .await
        .unwrap();

    // Wait for the spawned shutdown to stop accepting batches
    let mut status = StatusCode::CREATED;
    for _ in 0..100 {
        let (s, _body) = send(
            &app,
            post_json("/batches", json!({ "name": "Late", "items": [{ "topic": "a" }] })),
        )
        .await;
        status = s;
        if status == StatusCode::SERVICE_UNAVAILABLE {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown() {
    let (processor, _generator, _temp_dir) =
        create_test_processor(ScriptedGenerator::default()).await;
    let mut config = (*processor.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let processor = Arc::new(processor);

    let server = tokio::spawn(start_api_server(processor.clone(), Arc::new(config)));
    tokio::time::sleep(Duration::from_millis(50)).await;

    processor.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (processor, _generator, _temp_dir) =
        create_test_processor(ScriptedGenerator::default()).await;
    let processor = Arc::new(processor);

    let mut config = (*processor.get_config()).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(processor.clone(), Arc::new(config));
    let (status, _body) = send(&app, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut config = (*processor.get_config()).clone();
    config.server.api.swagger_ui = true;
    let app = create_router(processor, Arc::new(config));
    let (status, body) = send(&app, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "article-batch REST API");
}
