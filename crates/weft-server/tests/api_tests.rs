//! HTTP boundary tests: the controller routes requests into executions and
//! maps engine errors onto statuses.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use weft_core::{FlowBuilder, FlowExecutionManager, Transition, FLOW_EXECUTION_ID_ATTRIBUTE};
use weft_server::{router, AppState};
use weft_state_inmemory::{InMemoryExecutionRepository, InMemoryFlowCatalog};

fn app() -> Router {
    let catalog = Arc::new(InMemoryFlowCatalog::new());
    catalog.register_flow(
        FlowBuilder::new("order")
            .view_state(
                "details",
                Some("detailsForm"),
                vec![Transition::on("submit", "done")],
            )
            .end_state("done", Some("confirmation"))
            .build()
            .unwrap(),
    );
    let manager =
        FlowExecutionManager::new(catalog, Arc::new(InMemoryExecutionRepository::new()));
    router(AppState {
        manager: Arc::new(manager),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn launching_a_flow_returns_the_first_view() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/flows/order/executions",
        json!({ "input": { "customer": "C-1" } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["view"], "detailsForm");
    assert_eq!(body["model"]["customer"], "C-1");
    assert_eq!(
        body["model"][FLOW_EXECUTION_ID_ATTRIBUTE],
        body["execution_id"]
    );
}

#[tokio::test]
async fn signaling_drives_the_conversation_to_its_end() {
    let app = app();
    let (_, body) = send(&app, "POST", "/flows/order/executions", json!({})).await;
    let execution_id = body["execution_id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/executions/{execution_id}/signal"),
        json!({ "event": "submit" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ended");
    assert_eq!(body["view"], "confirmation");

    // The ended execution is gone; signaling again is a 404.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/executions/{execution_id}/signal"),
        json!({ "event": "submit" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn launching_an_unknown_flow_is_not_found() {
    let app = app();
    let (status, body) = send(&app, "POST", "/flows/missing/executions", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn signaling_an_unknown_execution_is_not_found() {
    let app = app();
    let (status, _) = send(
        &app,
        "POST",
        "/executions/no-such-execution/signal",
        json!({ "event": "submit" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unmatched_events_are_unprocessable() {
    let app = app();
    let (_, body) = send(&app, "POST", "/flows/order/executions", json!({})).await;
    let execution_id = body["execution_id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/executions/{execution_id}/signal"),
        json!({ "event": "bogus" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("bogus"));
}
