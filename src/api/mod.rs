//! 控制台 HTTP 服务
//!
//! `/api/*` 下的操作接口、SSE 事件流、webhook 接收，其余路径由静态目录兜底。

use std::{any::Any, sync::Arc, time::Instant};

use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Extension, Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir};

use crate::{
    app_state::AppState,
    config::Config,
    error::AppError,
    service::ActivityLog,
};

pub mod events;
pub mod express_route_api;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod webhook_api;

use middleware::{trace_id_middleware, TraceId};

pub fn routes(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    let api_routes = Router::new()
        // 余额与链上付款
        .route("/api/balance", get(handlers::balance))
        .route("/api/deposit-address", get(handlers::deposit_address))
        .route("/api/deposit-addresses", post(handlers::create_deposit_address))
        .route("/api/transfer", post(handlers::transfer))
        .route("/api/payouts/:id", get(handlers::payout_status))
        // 法币出金
        .route(
            "/api/business-payouts",
            post(handlers::create_business_payout).get(handlers::list_business_payouts),
        )
        .route("/api/business-payouts/:id", get(handlers::business_payout_status))
        // 电汇
        .route(
            "/api/wire-accounts",
            post(handlers::create_wire_account).get(handlers::list_wire_accounts),
        )
        .route(
            "/api/wire-accounts/:id/instructions",
            get(handlers::wire_instructions),
        )
        .route("/api/mock-wire", post(handlers::mock_wire))
        // 收款地址与业务转账
        .route(
            "/api/recipients",
            post(handlers::create_recipient).get(handlers::list_recipients),
        )
        .route("/api/recipients/:id", get(handlers::get_recipient))
        .route("/api/business-transfers", post(handlers::create_business_transfer))
        // 流程
        .route("/api/test-flow", post(handlers::test_flow))
        .route("/api/express-route/:step", post(express_route_api::run_step))
        // 通知订阅
        .route(
            "/api/subscriptions",
            post(handlers::subscribe).get(handlers::list_subscriptions),
        )
        .route("/api/subscriptions/:id", axum::routing::delete(handlers::unsubscribe))
        // 系统
        .route("/api/config", get(handlers::config))
        .route("/api/events", get(events::stream_events))
        .route("/api/*rest", any(api_not_found));

    Router::new()
        .merge(api_routes)
        .route(
            "/webhooks",
            post(webhook_api::receive_webhook).head(webhook_api::webhook_probe),
        )
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .fallback_service(static_dir)
        .layer(from_fn(add_response_time_header))
        .layer(from_fn(trace_log))
        .layer(from_fn(trace_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// 启动控制台服务器，Ctrl-C 时优雅退出
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind_addr();
    let state = Arc::new(AppState::new(Arc::new(config))?);
    let app = routes(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("🎉 Dashboard listening on http://{}", bind_addr);
    tracing::info!("🔗 Mint API base URL: {}", state.client.base_url());
    tracing::info!("📡 Webhook endpoint: http://{}/webhooks", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("👋 Shutting down dashboard");
        })
        .await?;

    Ok(())
}

/// 未匹配的 `/api/*` 返回结构化 404
async fn api_not_found(trace_id: Option<Extension<TraceId>>, req: Request) -> Response {
    let mut error = AppError::not_found(format!("no API route for {} {}", req.method(), req.uri().path()));
    if let Some(Extension(TraceId(id))) = trace_id {
        error = error.with_trace_id(id);
    }
    response::failure(&ActivityLog::new(), error)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::http::Response<String> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");

    let body = serde_json::json!({
        "logs": [],
        "data": null,
        "error": { "code": "internal", "message": "internal server error" },
    })
    .to_string();

    let mut response = axum::http::Response::new(body);
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

async fn add_response_time_header(req: Request, next: axum::middleware::Next) -> Response {
    let start = Instant::now();
    let mut resp = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis().to_string();
    resp.headers_mut().insert(
        "x-response-time",
        HeaderValue::from_str(&format!("{}ms", elapsed_ms))
            .unwrap_or(HeaderValue::from_static("0ms")),
    );
    resp
}

async fn trace_log(req: Request, next: axum::middleware::Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| "-".to_string());
    let resp = next.run(req).await;
    let status = resp.status();
    let elapsed = start.elapsed().as_millis();
    tracing::info!(trace_id = %trace_id, method = %method, path = %path, status = status.as_u16(), elapsed_ms = %elapsed, "http_request");
    resp.into_response()
}
