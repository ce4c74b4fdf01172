//! 控制台路由测试（tower oneshot）

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::*;
use mint_harness::{api, service::mint::HttpMethod, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const MAX_SIZE: usize = 1024 * 1024;

fn app_with(transport: &Arc<ScriptedTransport>) -> (Router, Arc<AppState>) {
    let state = Arc::new(
        AppState::with_transport(Arc::new(test_config()), transport.clone()).unwrap(),
    );
    (api::routes(state.clone()), state)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), MAX_SIZE).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_head_webhooks_is_always_ok() {
    let (app, _) = app_with(&ScriptedTransport::new());
    let response = app
        .oneshot(Request::head("/webhooks").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_reaches_live_listeners() {
    let (app, state) = app_with(&ScriptedTransport::new());
    let mut listener = state.events.subscribe();

    let (status, body) = send(
        app,
        Method::POST,
        "/webhooks",
        Some(json!({"notificationType": "payouts", "payout": {"id": "po-1"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(body["listeners"], 1);

    let event = listener.recv().await.unwrap();
    assert_eq!(event.kind, "webhook");
    assert_eq!(event.payload["payout"]["id"], "po-1");
}

#[tokio::test]
async fn test_non_json_webhook_is_forwarded_raw() {
    let (app, state) = app_with(&ScriptedTransport::new());
    let mut listener = state.events.subscribe();

    let response = app
        .oneshot(
            Request::post("/webhooks")
                .header("content-type", "text/plain")
                .body(Body::from("ping from provider"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let event = listener.recv().await.unwrap();
    assert_eq!(event.payload, json!({"raw": "ping from provider"}));
}

#[tokio::test]
async fn test_unknown_api_route_is_structured_404() {
    let (app, _) = app_with(&ScriptedTransport::new());
    let (status, body) = send(app, Method::GET, "/api/x", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["logs"], json!([]));
    assert_eq!(body["data"], Value::Null);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_balance_returns_envelope_with_logs() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Get, "/v1/balances", 200, balance("7.25"));
    let (app, _) = app_with(&transport);

    let (status, body) = send(app, Method::GET, "/api/balance", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available"][0]["amount"], "7.25");
    assert!(body["logs"].as_array().map_or(false, |logs| !logs.is_empty()));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_remote_conflict_maps_to_409() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            HttpMethod::Post,
            "/v1/businessAccount/wallets/addresses/recipient",
            409,
            json!({"code": 0, "message": "exists"}),
        )
        .on(
            HttpMethod::Get,
            "/v1/businessAccount/wallets/addresses/recipient",
            200,
            data(json!([])),
        );
    let (app, _) = app_with(&transport);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/recipients",
        Some(json!({"chain": "ETH", "address": "0xabc", "description": "test"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_invalid_body_is_400_without_remote_call() {
    let transport = ScriptedTransport::new();
    let (app, _) = app_with(&transport);

    let (status, body) = send(app, Method::POST, "/api/transfer", Some(json!({"chain": "ETH"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_express_route_step_is_400() {
    let (app, _) = app_with(&ScriptedTransport::new());
    let (status, body) = send(app, Method::POST, "/api/express-route/teleport", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("teleport"));
}

#[tokio::test]
async fn test_config_endpoint_masks_api_key() {
    let (app, _) = app_with(&ScriptedTransport::new());
    let (status, body) = send(app, Method::GET, "/api/config", None).await;

    assert_eq!(status, StatusCode::OK);
    let text = body.to_string();
    assert!(!text.contains(API_KEY));
}

#[tokio::test]
async fn test_response_carries_trace_id() {
    let (app, _) = app_with(&ScriptedTransport::new());
    let response = app
        .oneshot(
            Request::get("/healthz")
                .header("X-Trace-Id", "trace-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-trace-id"], "trace-123");
}
