//! Webhook 回调接收
//!
//! Mint 通过 SNS 推送通知：HEAD 用于可达性探测，POST 携带通知内容。
//! 收到的每条通知都转发给当前连接的 SSE 监听者。

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::{
    api::events::LiveEvent,
    app_state::AppState,
    metrics,
};

/// HEAD /webhooks - 可达性探测，始终成功
pub async fn webhook_probe() -> StatusCode {
    StatusCode::OK
}

/// POST /webhooks - 接收通知并广播
pub async fn receive_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let payload = parse_payload(&body);

    if let Some(url) = confirmation_url(&payload) {
        let http = state.http.clone();
        tokio::spawn(async move {
            confirm_subscription(&http, &url).await;
        });
    }

    let notification_type = payload
        .get("notificationType")
        .or_else(|| payload.get("Type"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let listeners = state.events.publish(LiveEvent::webhook(payload));
    metrics::count_webhook(listeners);
    tracing::info!(
        notification_type = %notification_type,
        listeners,
        "📨 Webhook received and forwarded"
    );

    (
        StatusCode::OK,
        Json(json!({ "received": true, "listeners": listeners })),
    )
}

/// 非 JSON 内容按原文转发
fn parse_payload(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(_) => json!({ "raw": String::from_utf8_lossy(body) }),
    }
}

/// SNS 订阅确认地址，仅接受 amazonaws.com 下的 HTTPS 地址
fn confirmation_url(payload: &Value) -> Option<String> {
    if payload.get("Type").and_then(Value::as_str) != Some("SubscriptionConfirmation") {
        return None;
    }
    let raw = payload.get("SubscribeURL").and_then(Value::as_str)?;
    let url = reqwest::Url::parse(raw).ok()?;
    let host = url.host_str()?;
    if url.scheme() != "https" || !(host == "amazonaws.com" || host.ends_with(".amazonaws.com")) {
        tracing::warn!(url = raw, "ignoring untrusted SubscribeURL");
        return None;
    }
    Some(url.to_string())
}

async fn confirm_subscription(http: &reqwest::Client, url: &str) {
    match http.get(url).send().await {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("✅ SNS subscription confirmed");
        }
        Ok(resp) => {
            tracing::warn!(status = resp.status().as_u16(), "SNS subscription confirmation rejected");
        }
        Err(e) => {
            tracing::warn!(error = %e, "SNS subscription confirmation failed");
        }
    }
}
