//! Express Route 分步接口
//!
//! POST /api/express-route/:step，`run` 执行完整流程。

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    api::response::{optional_body, respond},
    app_state::AppState,
    error::MintError,
    service::{ActivityLog, ExpressRouteTester, FullFlowOptions},
};

/// 各步骤共用的请求体，字段按步骤取用
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressStepBody {
    pub chain: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<String>,
    pub tracking_ref: Option<String>,
    pub account_number: Option<String>,
    pub address: Option<String>,
    pub recipient_id: Option<String>,
    pub bank_id: Option<String>,
    pub receipt_address_id: Option<String>,
    #[serde(alias = "type")]
    pub destination_type: Option<String>,
}

fn field<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, MintError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| MintError::Validation(format!("{} is required", name)))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, MintError> {
    Ok(serde_json::to_value(value)?)
}

pub async fn run_step(
    State(state): State<Arc<AppState>>,
    Path(step): Path<String>,
    body: Bytes,
) -> Response {
    let log = ActivityLog::new();
    let tester = state.express_route_tester(&log);
    let result = match optional_body::<ExpressStepBody>(&body) {
        Ok(body) => dispatch(&state, &tester, &step, body).await,
        Err(e) => Err(e),
    };
    respond(&log, result)
}

async fn dispatch(
    state: &AppState,
    tester: &ExpressRouteTester,
    step: &str,
    body: ExpressStepBody,
) -> Result<Value, MintError> {
    let flow = &state.config.flow;
    match step {
        "link-bank" => to_json(tester.link_bank_account().await?),
        "link-receipt" => {
            let chain = body.chain.as_deref().unwrap_or(&flow.chain);
            to_json(
                tester
                    .link_receipt_address(chain, body.currency.as_deref())
                    .await?,
            )
        }
        "mock-deposit" => {
            tester
                .mock_deposit(
                    field(&body.tracking_ref, "trackingRef")?,
                    field(&body.amount, "amount")?,
                    field(&body.account_number, "accountNumber")?,
                )
                .await
        }
        "onchain-deposit" => {
            tester
                .onchain_deposit(
                    field(&body.address, "address")?,
                    field(&body.chain, "chain")?,
                    field(&body.amount, "amount")?,
                    body.currency.as_deref(),
                )
                .await
        }
        "transfer" => to_json(
            tester
                .transfer(
                    field(&body.recipient_id, "recipientId")?,
                    field(&body.amount, "amount")?,
                    body.currency.as_deref(),
                )
                .await?,
        ),
        "withdraw" => to_json(
            tester
                .withdraw(
                    field(&body.bank_id, "bankId")?,
                    field(&body.amount, "amount")?,
                    body.currency.as_deref(),
                    body.destination_type.as_deref(),
                )
                .await?,
        ),
        "create" => to_json(
            tester
                .create_route(
                    field(&body.receipt_address_id, "receiptAddressId")?,
                    field(&body.bank_id, "bankId")?,
                    body.destination_type.as_deref(),
                    body.currency.as_deref(),
                )
                .await?,
        ),
        "run" => {
            let mut opts = FullFlowOptions::from_config(&state.config);
            if let Some(chain) = body.chain {
                opts.chain = chain;
            }
            if let Some(amount) = body.amount {
                opts.amount = amount;
            }
            to_json(tester.run_full_flow(&opts).await?)
        }
        other => Err(MintError::Validation(format!(
            "unknown express route step '{}'",
            other
        ))),
    }
}
