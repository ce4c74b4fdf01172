//! Mint API 客户端
//!
//! 每个远端操作对应一个方法；所有请求都带 Bearer 凭证与 JSON 头，
//! 非 HTTPS 基础地址或缺少凭证时在发出请求前直接拒绝。
//!
//! API文档: https://developers.circle.com/api-reference

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{
    models::*,
    transport::{HttpMethod, MintTransport, ReqwestTransport, TransportRequest},
};
use crate::{
    config::MintConfig,
    domain::{amount::parse_amount, classify, IdempotencyKey, RemoteErrorBody},
    error::MintError,
    metrics,
};

const BALANCES: &str = "/v1/balances";
const BALANCES_LEGACY: &str = "/v1/businessAccount/balances";
const DEPOSIT_ADDRESSES: &str = "/v1/wallets/addresses/deposit";
const DEPOSIT_ADDRESSES_LEGACY: &str = "/v1/businessAccount/wallets/addresses/deposit";
const ADDRESS_BOOK: &str = "/v1/addressBook/recipients";
const PAYOUTS: &str = "/v1/payouts";
const WIRE_BANKS: &str = "/v1/businessAccount/banks/wires";
const MOCK_WIRE: &str = "/v1/mocks/payments/wire";
const MOCK_ONCHAIN: &str = "/v1/mocks/blockchain/deposits";
const RECIPIENT_ADDRESSES: &str = "/v1/businessAccount/wallets/addresses/recipient";
const BUSINESS_TRANSFERS: &str = "/v1/businessAccount/transfers";
const BUSINESS_PAYOUTS: &str = "/v1/businessAccount/payouts";
const EXPRESS_ROUTES: &str = "/v1/businessAccount/expressRoutes";
const SUBSCRIPTIONS: &str = "/v1/notifications/subscriptions";

pub struct MintClient {
    base_url: String,
    api_key: String,
    transport: Arc<dyn MintTransport>,
}

impl MintClient {
    /// 使用 reqwest 传输层创建客户端
    pub fn new(config: &MintConfig) -> Result<Self, MintError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &MintConfig, transport: Arc<dyn MintTransport>) -> Self {
        Self {
            base_url: config.resolved_base_url(),
            api_key: config.api_key.trim().to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 请求前检查：HTTPS 与凭证
    fn ensure_ready(&self) -> Result<(), MintError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| MintError::InsecureUrl(format!("{} ({})", self.base_url, e)))?;
        if url.scheme() != "https" {
            return Err(MintError::InsecureUrl(self.base_url.clone()));
        }
        if self.api_key.is_empty() {
            return Err(MintError::MissingCredential);
        }
        Ok(())
    }

    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        endpoint: &'static str,
    ) -> Result<Value, MintError> {
        self.ensure_ready()?;

        let request = TransportRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers: vec![
                ("Authorization".into(), format!("Bearer {}", self.api_key)),
                ("Content-Type".into(), "application/json".into()),
                ("Accept".into(), "application/json".into()),
            ],
            body,
        };

        tracing::debug!(method = method.as_str(), path, "calling Mint API");
        let started = Instant::now();
        let result = self.transport.execute(request).await;
        let latency = started.elapsed().as_millis();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::observe_remote_call(endpoint, false, latency);
                tracing::error!(method = method.as_str(), path, error = %e, "Mint API transport failure");
                return Err(e);
            }
        };

        metrics::observe_remote_call(endpoint, response.is_success(), latency);

        if response.is_success() {
            tracing::debug!(method = method.as_str(), path, status = response.status, latency_ms = latency as u64, "Mint API ok");
            parse_success(&response.body)
        } else {
            let err = parse_error(response.status, &response.body);
            tracing::warn!(method = method.as_str(), path, status = response.status, error = %err, "Mint API returned error");
            Err(err)
        }
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        endpoint: &'static str,
    ) -> Result<T, MintError> {
        let value = self.call(method, path, body, endpoint).await?;
        decode(value, endpoint)
    }

    /// 主端点 404 时改用旧端点；两者都失败时返回主端点的原始错误
    async fn call_with_fallback(
        &self,
        method: HttpMethod,
        primary: &str,
        legacy: &str,
        body: Option<Value>,
        endpoint: &'static str,
    ) -> Result<Value, MintError> {
        match self.call(method, primary, body.clone(), endpoint).await {
            Err(err) if err.is_not_found() => {
                tracing::warn!(primary, legacy, "primary endpoint returned 404, retrying legacy endpoint");
                metrics::count_fallback(endpoint);
                match self.call(method, legacy, body, endpoint).await {
                    Ok(value) => Ok(value),
                    Err(legacy_err) => {
                        tracing::warn!(legacy, error = %legacy_err, "legacy endpoint failed as well");
                        Err(err)
                    }
                }
            }
            other => other,
        }
    }

    // ============ 余额 ============

    pub async fn get_balance(&self) -> Result<Balance, MintError> {
        let value = self
            .call_with_fallback(HttpMethod::Get, BALANCES, BALANCES_LEGACY, None, "balances")
            .await?;
        decode(value, "balances")
    }

    pub async fn ping(&self) -> Result<Value, MintError> {
        self.call(HttpMethod::Get, "/ping", None, "ping").await
    }

    // ============ 充值地址 ============

    pub async fn list_deposit_addresses(&self) -> Result<Vec<DepositAddress>, MintError> {
        let value = self
            .call_with_fallback(
                HttpMethod::Get,
                DEPOSIT_ADDRESSES,
                DEPOSIT_ADDRESSES_LEGACY,
                None,
                "deposit_addresses",
            )
            .await?;
        decode(value, "deposit_addresses")
    }

    pub async fn create_deposit_address(
        &self,
        chain: &str,
        currency: &str,
    ) -> Result<DepositAddress, MintError> {
        let request = CreateDepositAddressRequest {
            idempotency_key: IdempotencyKey::generate(),
            currency: currency.to_string(),
            chain: chain.to_string(),
        };
        let value = self
            .call_with_fallback(
                HttpMethod::Post,
                DEPOSIT_ADDRESSES,
                DEPOSIT_ADDRESSES_LEGACY,
                Some(to_body(&request)?),
                "create_deposit_address",
            )
            .await?;
        decode(value, "create_deposit_address")
    }

    // ============ 地址簿与付款 ============

    pub async fn create_address_book_recipient(
        &self,
        request: &CreateAddressBookRecipientRequest,
    ) -> Result<AddressBookRecipient, MintError> {
        self.call_as(
            HttpMethod::Post,
            ADDRESS_BOOK,
            Some(to_body(request)?),
            "create_address_book_recipient",
        )
        .await
    }

    pub async fn list_address_book_recipients(
        &self,
    ) -> Result<Vec<AddressBookRecipient>, MintError> {
        self.call_as(HttpMethod::Get, ADDRESS_BOOK, None, "address_book_recipients")
            .await
    }

    pub async fn delete_address_book_recipient(&self, id: &str) -> Result<Value, MintError> {
        let path = format!("{}/{}", ADDRESS_BOOK, path_id(id)?);
        self.call(HttpMethod::Delete, &path, None, "delete_address_book_recipient")
            .await
    }

    /// 付款目的地必须是地址簿 ID，绝不接受裸地址
    pub async fn create_payout(&self, request: &CreatePayoutRequest) -> Result<Payout, MintError> {
        ensure_address_book_id(&request.destination.id)?;
        parse_amount(&request.amount.amount)?;
        self.call_as(HttpMethod::Post, PAYOUTS, Some(to_body(request)?), "create_payout")
            .await
    }

    pub async fn get_payout(&self, id: &str) -> Result<Payout, MintError> {
        let path = format!("{}/{}", PAYOUTS, path_id(id)?);
        self.call_as(HttpMethod::Get, &path, None, "get_payout").await
    }

    // ============ 电汇 ============

    pub async fn create_wire_bank_account(
        &self,
        request: &CreateWireBankAccountRequest,
    ) -> Result<WireBankAccount, MintError> {
        self.call_as(
            HttpMethod::Post,
            WIRE_BANKS,
            Some(to_body(request)?),
            "create_wire_bank_account",
        )
        .await
    }

    pub async fn list_wire_bank_accounts(&self) -> Result<Vec<WireBankAccount>, MintError> {
        self.call_as(HttpMethod::Get, WIRE_BANKS, None, "wire_bank_accounts")
            .await
    }

    pub async fn get_wire_bank_account(&self, id: &str) -> Result<WireBankAccount, MintError> {
        let path = format!("{}/{}", WIRE_BANKS, path_id(id)?);
        self.call_as(HttpMethod::Get, &path, None, "get_wire_bank_account")
            .await
    }

    pub async fn get_wire_instructions(
        &self,
        id: &str,
        currency: &str,
    ) -> Result<WireInstructions, MintError> {
        let path = format!(
            "{}/{}/instructions?currency={}",
            WIRE_BANKS,
            path_id(id)?,
            query_value(currency)?
        );
        self.call_as(HttpMethod::Get, &path, None, "wire_instructions")
            .await
    }

    pub async fn mock_wire_deposit(
        &self,
        request: &MockWireDepositRequest,
    ) -> Result<Value, MintError> {
        parse_amount(&request.amount.amount)?;
        self.call(HttpMethod::Post, MOCK_WIRE, Some(to_body(request)?), "mock_wire_deposit")
            .await
    }

    pub async fn mock_onchain_deposit(
        &self,
        request: &MockOnchainDepositRequest,
    ) -> Result<Value, MintError> {
        parse_amount(&request.amount.amount)?;
        self.call(
            HttpMethod::Post,
            MOCK_ONCHAIN,
            Some(to_body(request)?),
            "mock_onchain_deposit",
        )
        .await
    }

    // ============ 收款地址 ============

    pub async fn create_recipient_address(
        &self,
        request: &CreateRecipientAddressRequest,
    ) -> Result<RecipientAddress, MintError> {
        self.call_as(
            HttpMethod::Post,
            RECIPIENT_ADDRESSES,
            Some(to_body(request)?),
            "create_recipient_address",
        )
        .await
    }

    pub async fn list_recipient_addresses(&self) -> Result<Vec<RecipientAddress>, MintError> {
        self.call_as(HttpMethod::Get, RECIPIENT_ADDRESSES, None, "recipient_addresses")
            .await
    }

    pub async fn get_recipient_address(&self, id: &str) -> Result<RecipientAddress, MintError> {
        let path = format!("{}/{}", RECIPIENT_ADDRESSES, path_id(id)?);
        self.call_as(HttpMethod::Get, &path, None, "get_recipient_address")
            .await
    }

    pub async fn delete_recipient_address(&self, id: &str) -> Result<Value, MintError> {
        let path = format!("{}/{}", RECIPIENT_ADDRESSES, path_id(id)?);
        self.call(HttpMethod::Delete, &path, None, "delete_recipient_address")
            .await
    }

    // ============ 业务转账与出金 ============

    pub async fn create_business_transfer(
        &self,
        request: &CreateBusinessTransferRequest,
    ) -> Result<BusinessTransfer, MintError> {
        parse_amount(&request.amount.amount)?;
        self.call_as(
            HttpMethod::Post,
            BUSINESS_TRANSFERS,
            Some(to_body(request)?),
            "create_business_transfer",
        )
        .await
    }

    pub async fn get_business_transfer(&self, id: &str) -> Result<BusinessTransfer, MintError> {
        let path = format!("{}/{}", BUSINESS_TRANSFERS, path_id(id)?);
        self.call_as(HttpMethod::Get, &path, None, "get_business_transfer")
            .await
    }

    pub async fn create_business_payout(
        &self,
        request: &CreateBusinessPayoutRequest,
    ) -> Result<BusinessPayout, MintError> {
        parse_amount(&request.amount.amount)?;
        self.call_as(
            HttpMethod::Post,
            BUSINESS_PAYOUTS,
            Some(to_body(request)?),
            "create_business_payout",
        )
        .await
    }

    pub async fn list_business_payouts(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<BusinessPayout>, MintError> {
        let path = match status {
            Some(status) => format!("{}?status={}", BUSINESS_PAYOUTS, query_value(status)?),
            None => BUSINESS_PAYOUTS.to_string(),
        };
        self.call_as(HttpMethod::Get, &path, None, "business_payouts")
            .await
    }

    pub async fn get_business_payout(&self, id: &str) -> Result<BusinessPayout, MintError> {
        let path = format!("{}/{}", BUSINESS_PAYOUTS, path_id(id)?);
        self.call_as(HttpMethod::Get, &path, None, "get_business_payout")
            .await
    }

    // ============ Express Route ============

    pub async fn create_express_route(
        &self,
        request: &CreateExpressRouteRequest,
    ) -> Result<ExpressRoute, MintError> {
        self.call_as(
            HttpMethod::Post,
            EXPRESS_ROUTES,
            Some(to_body(request)?),
            "create_express_route",
        )
        .await
    }

    pub async fn list_express_routes(&self) -> Result<Vec<ExpressRoute>, MintError> {
        self.call_as(HttpMethod::Get, EXPRESS_ROUTES, None, "express_routes")
            .await
    }

    pub async fn get_express_route(&self, id: &str) -> Result<ExpressRoute, MintError> {
        let path = format!("{}/{}", EXPRESS_ROUTES, path_id(id)?);
        self.call_as(HttpMethod::Get, &path, None, "get_express_route")
            .await
    }

    // ============ 通知订阅 ============

    pub async fn create_subscription(&self, endpoint: &str) -> Result<Subscription, MintError> {
        let request = CreateSubscriptionRequest {
            endpoint: endpoint.to_string(),
        };
        self.call_as(
            HttpMethod::Post,
            SUBSCRIPTIONS,
            Some(to_body(&request)?),
            "create_subscription",
        )
        .await
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, MintError> {
        self.call_as(HttpMethod::Get, SUBSCRIPTIONS, None, "subscriptions")
            .await
    }

    pub async fn delete_subscription(&self, id: &str) -> Result<Value, MintError> {
        let path = format!("{}/{}", SUBSCRIPTIONS, path_id(id)?);
        self.call(HttpMethod::Delete, &path, None, "delete_subscription")
            .await
    }
}

fn to_body<T: Serialize>(request: &T) -> Result<Value, MintError> {
    serde_json::to_value(request)
        .map_err(|e| MintError::Validation(format!("failed to serialize request: {}", e)))
}

fn decode<T: DeserializeOwned>(value: Value, endpoint: &str) -> Result<T, MintError> {
    serde_json::from_value(value).map_err(|e| MintError::Decode(format!("{}: {}", endpoint, e)))
}

/// 成功响应：远端以 `{"data": ...}` 包装，存在时解包
fn parse_success(body: &str) -> Result<Value, MintError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let mut value: Value = serde_json::from_str(body)?;
    if let Some(data) = value.as_object_mut().and_then(|obj| obj.remove("data")) {
        return Ok(data);
    }
    Ok(value)
}

/// 错误响应：优先按 JSON 解析，否则保留原始文本
fn parse_error(status: u16, body: &str) -> MintError {
    let (payload, parsed) = match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let parsed: RemoteErrorBody = serde_json::from_value(value.clone()).unwrap_or_default();
            (value, parsed)
        }
        Err(_) => (Value::String(body.to_string()), RemoteErrorBody::default()),
    };

    let message = parsed.message.unwrap_or_else(|| match &payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    });

    MintError::Api {
        status,
        kind: classify(status, parsed.code, &message),
        code: parsed.code,
        message,
        payload,
    }
}

/// 路径中的资源 ID 不允许包含分隔符
fn path_id(id: &str) -> Result<&str, MintError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(MintError::Validation("resource id is required".into()));
    }
    if id
        .chars()
        .any(|c| c == '/' || c == '?' || c == '#' || c == '%' || c.is_whitespace())
    {
        return Err(MintError::Validation(format!("invalid resource id: {:?}", id)));
    }
    Ok(id)
}

fn query_value(value: &str) -> Result<&str, MintError> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(MintError::Validation(format!("invalid query value: {:?}", value)));
    }
    Ok(value)
}

fn ensure_address_book_id(id: &str) -> Result<(), MintError> {
    if uuid::Uuid::parse_str(id.trim()).is_err() {
        return Err(MintError::Validation(format!(
            "payout destination must be an address-book recipient id, not a raw address: {}",
            id
        )));
    }
    Ok(())
}
