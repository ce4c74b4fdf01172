//! 控制台操作接口
//!
//! 每个接口新建一份活动日志，调用对应测试器，再用信封格式返回。

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{
    api::response::{json_body, optional_body, respond},
    app_state::AppState,
    service::{ActivityLog, AutoTransfer},
};

// ============ 请求体 ============

#[derive(Debug, Deserialize)]
pub struct ChainQuery {
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDepositAddressBody {
    pub chain: String,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub address: String,
    pub chain: String,
    pub amount: String,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessPayoutBody {
    #[serde(alias = "type")]
    pub destination_type: String,
    pub bank_id: String,
    pub amount: String,
    pub currency: String,
    pub wallet_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockWireBody {
    pub tracking_ref: String,
    pub amount: String,
    pub account_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientBody {
    pub chain: String,
    pub address: String,
    pub description: String,
    pub address_tag: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessTransferBody {
    pub recipient_id: String,
    pub amount: String,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AutoTransferBody {
    pub address: String,
    pub amount: String,
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFlowBody {
    pub chain: Option<String>,
    pub auto_transfer: Option<AutoTransferBody>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    #[serde(alias = "url")]
    pub endpoint: String,
}

// ============ 余额与链上付款 ============

/// GET /api/balance
pub async fn balance(State(state): State<Arc<AppState>>) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).check_balance().await;
    respond(&log, result)
}

/// GET /api/deposit-address?chain=
pub async fn deposit_address(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChainQuery>,
) -> Response {
    let log = ActivityLog::new();
    let chain = query.chain.unwrap_or_else(|| state.config.flow.chain.clone());
    let result = state
        .account_tester(&log)
        .get_deposit_address(&chain, None)
        .await;
    respond(&log, result)
}

/// POST /api/deposit-addresses
pub async fn create_deposit_address(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDepositAddressBody>, JsonRejection>,
) -> Response {
    let log = ActivityLog::new();
    let result = match json_body(payload) {
        Ok(body) => {
            state
                .account_tester(&log)
                .create_deposit_address(&body.chain, body.currency.as_deref())
                .await
        }
        Err(e) => Err(e),
    };
    respond(&log, result)
}

/// POST /api/transfer
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransferBody>, JsonRejection>,
) -> Response {
    let log = ActivityLog::new();
    let result = match json_body(payload) {
        Ok(body) => {
            state
                .account_tester(&log)
                .create_payout(&body.address, &body.chain, &body.amount, body.currency.as_deref())
                .await
        }
        Err(e) => Err(e),
    };
    respond(&log, result)
}

/// GET /api/payouts/:id
pub async fn payout_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).get_payout_status(&id).await;
    respond(&log, result)
}

// ============ 法币出金 ============

/// POST /api/business-payouts
pub async fn create_business_payout(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BusinessPayoutBody>, JsonRejection>,
) -> Response {
    let log = ActivityLog::new();
    let result = match json_body(payload) {
        Ok(body) => {
            state
                .account_tester(&log)
                .create_business_payout(
                    &body.destination_type,
                    &body.bank_id,
                    &body.amount,
                    &body.currency,
                    body.wallet_id.as_deref(),
                )
                .await
        }
        Err(e) => Err(e),
    };
    respond(&log, result)
}

/// GET /api/business-payouts?status=
pub async fn list_business_payouts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let log = ActivityLog::new();
    let result = state
        .account_tester(&log)
        .list_business_payouts(query.status.as_deref())
        .await;
    respond(&log, result)
}

/// GET /api/business-payouts/:id
pub async fn business_payout_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).get_business_payout(&id).await;
    respond(&log, result)
}

// ============ 电汇 ============

/// POST /api/wire-accounts
pub async fn create_wire_account(State(state): State<Arc<AppState>>) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).create_wire_account().await;
    respond(&log, result)
}

/// GET /api/wire-accounts
pub async fn list_wire_accounts(State(state): State<Arc<AppState>>) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).list_wire_accounts().await;
    respond(&log, result)
}

/// GET /api/wire-accounts/:id/instructions
pub async fn wire_instructions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).get_wire_instructions(&id).await;
    respond(&log, result)
}

/// POST /api/mock-wire
pub async fn mock_wire(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MockWireBody>, JsonRejection>,
) -> Response {
    let log = ActivityLog::new();
    let result = match json_body(payload) {
        Ok(body) => {
            state
                .account_tester(&log)
                .mock_wire_deposit(&body.tracking_ref, &body.amount, &body.account_number)
                .await
        }
        Err(e) => Err(e),
    };
    respond(&log, result)
}

// ============ 收款地址与业务转账 ============

/// POST /api/recipients
pub async fn create_recipient(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecipientBody>, JsonRejection>,
) -> Response {
    let log = ActivityLog::new();
    let result = match json_body(payload) {
        Ok(body) => {
            state
                .account_tester(&log)
                .create_recipient_address(
                    &body.chain,
                    &body.address,
                    &body.description,
                    body.address_tag.as_deref(),
                    body.currency.as_deref(),
                )
                .await
        }
        Err(e) => Err(e),
    };
    respond(&log, result)
}

/// GET /api/recipients
pub async fn list_recipients(State(state): State<Arc<AppState>>) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).list_recipient_addresses().await;
    respond(&log, result)
}

/// GET /api/recipients/:id
pub async fn get_recipient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let log = ActivityLog::new();
    let result = state.account_tester(&log).get_recipient_address(&id).await;
    respond(&log, result)
}

/// POST /api/business-transfers
pub async fn create_business_transfer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BusinessTransferBody>, JsonRejection>,
) -> Response {
    let log = ActivityLog::new();
    let result = match json_body(payload) {
        Ok(body) => {
            state
                .account_tester(&log)
                .create_business_transfer(&body.recipient_id, &body.amount, body.currency.as_deref())
                .await
        }
        Err(e) => Err(e),
    };
    respond(&log, result)
}

/// POST /api/test-flow
pub async fn test_flow(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let log = ActivityLog::new();
    let result = match optional_body::<TestFlowBody>(&body) {
        Ok(body) => {
            let chain = body.chain.unwrap_or_else(|| state.config.flow.chain.clone());
            let auto_transfer = body.auto_transfer.map(|t| AutoTransfer {
                address: t.address,
                amount: t.amount,
                currency: t.currency.unwrap_or_else(|| state.config.flow.currency.clone()),
            });
            state
                .account_tester(&log)
                .run_test_flow(&chain, auto_transfer)
                .await
        }
        Err(e) => Err(e),
    };
    respond(&log, result)
}

// ============ 通知订阅 ============

/// POST /api/subscriptions
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubscribeBody>, JsonRejection>,
) -> Response {
    let log = ActivityLog::new();
    let result = match json_body(payload) {
        Ok(body) => state.notification_tester(&log).subscribe(&body.endpoint).await,
        Err(e) => Err(e),
    };
    respond(&log, result)
}

/// GET /api/subscriptions
pub async fn list_subscriptions(State(state): State<Arc<AppState>>) -> Response {
    let log = ActivityLog::new();
    let result = state.notification_tester(&log).list().await;
    respond(&log, result)
}

/// DELETE /api/subscriptions/:id
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let log = ActivityLog::new();
    let result = state.notification_tester(&log).unsubscribe(&id).await;
    respond(&log, result)
}

// ============ 系统 ============

/// GET /api/config（脱敏）
pub async fn config(State(state): State<Arc<AppState>>) -> Response {
    let log = ActivityLog::new();
    respond(&log, Ok::<_, crate::error::MintError>(state.config.redacted()))
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn metrics() -> impl IntoResponse {
    crate::metrics::render_prometheus()
}
