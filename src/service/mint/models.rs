//! Mint API 请求/响应结构
//!
//! 响应结构只声明调用方需要的字段，其余字段保存在 `extra` 中原样输出。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::IdempotencyKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyAmount {
    pub amount: String,
    pub currency: String,
}

impl MoneyAmount {
    pub fn new(amount: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency: currency.into(),
        }
    }
}

// ============ 余额 ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(default)]
    pub available: Vec<MoneyAmount>,
    #[serde(default)]
    pub unsettled: Vec<MoneyAmount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Balance {
    /// 指定币种的可用余额（不存在时为 None）
    pub fn available_in(&self, currency: &str) -> Option<&str> {
        self.available
            .iter()
            .find(|m| m.currency.eq_ignore_ascii_case(currency))
            .map(|m| m.amount.as_str())
    }
}

// ============ 充值地址 ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositAddressRequest {
    pub idempotency_key: IdempotencyKey,
    pub currency: String,
    pub chain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub address: String,
    #[serde(default)]
    pub address_tag: Option<String>,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub chain: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ 地址簿 ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bns: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressBookRecipientRequest {
    pub idempotency_key: IdempotencyKey,
    pub chain: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_tag: Option<String>,
    pub metadata: RecipientMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBookRecipient {
    pub id: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address_tag: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ 加密货币付款 ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutDestination {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl PayoutDestination {
    pub fn address_book(id: impl Into<String>) -> Self {
        Self {
            kind: "address_book".into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl WalletSource {
    pub fn wallet(id: impl Into<String>) -> Self {
        Self {
            kind: "wallet".into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayoutRequest {
    pub idempotency_key: IdempotencyKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<WalletSource>,
    pub destination: PayoutDestination,
    pub amount: MoneyAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<MoneyAmount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ 电汇银行账户 ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    pub name: String,
    pub city: String,
    pub country: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAddress {
    pub bank_name: String,
    pub city: String,
    pub country: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWireBankAccountRequest {
    pub idempotency_key: IdempotencyKey,
    pub account_number: String,
    pub routing_number: String,
    pub billing_details: BillingDetails,
    pub bank_address: BankAddress,
}

impl CreateWireBankAccountRequest {
    /// 沙箱文档中的测试银行数据
    pub fn sandbox_default() -> Self {
        Self {
            idempotency_key: IdempotencyKey::generate(),
            account_number: "12340010".into(),
            routing_number: "121000248".into(),
            billing_details: BillingDetails {
                name: "Satoshi Nakamoto".into(),
                city: "Boston".into(),
                country: "US".into(),
                line1: "100 Money Street".into(),
                line2: Some("Suite 1".into()),
                district: Some("MA".into()),
                postal_code: "01234".into(),
            },
            bank_address: BankAddress {
                bank_name: "SAN FRANCISCO".into(),
                city: "SAN FRANCISCO".into(),
                country: "US".into(),
                line1: "100 Money Street".into(),
                line2: Some("Suite 1".into()),
                district: Some("CA".into()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBankAccount {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracking_ref: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeneficiaryBank {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub routing_number: Option<String>,
    #[serde(default)]
    pub swift_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInstructions {
    #[serde(default)]
    pub tracking_ref: Option<String>,
    #[serde(default)]
    pub beneficiary: Option<Value>,
    #[serde(default)]
    pub beneficiary_bank: Option<BeneficiaryBank>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WireInstructions {
    pub fn beneficiary_account_number(&self) -> Option<&str> {
        self.beneficiary_bank
            .as_ref()
            .and_then(|b| b.account_number.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn tracking_ref(&self) -> Option<&str> {
        self.tracking_ref.as_deref().filter(|s| !s.trim().is_empty())
    }
}

// ============ 模拟入金 ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockBeneficiaryBank {
    pub account_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockWireDepositRequest {
    pub tracking_ref: String,
    pub amount: MoneyAmount,
    pub beneficiary_bank: MockBeneficiaryBank,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockOnchainDepositRequest {
    pub idempotency_key: IdempotencyKey,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_tag: Option<String>,
    pub chain: String,
    pub amount: MoneyAmount,
}

// ============ 收款地址（业务转账） ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipientAddressRequest {
    pub idempotency_key: IdempotencyKey,
    pub chain: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_tag: Option<String>,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientAddress {
    pub id: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub address_tag: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ 业务转账 / 业务付款 ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDestination {
    #[serde(rename = "type")]
    pub kind: String,
    pub address_id: String,
}

impl TransferDestination {
    pub fn verified_blockchain(address_id: impl Into<String>) -> Self {
        Self {
            kind: "verified_blockchain".into(),
            address_id: address_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessTransferRequest {
    pub idempotency_key: IdempotencyKey,
    pub destination: TransferDestination,
    pub amount: MoneyAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessTransfer {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<MoneyAmount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 法币出金目的地类型
pub const BUSINESS_PAYOUT_DESTINATIONS: &[&str] = &["wire", "sepa", "sepa_instant", "pix", "cubix"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDestination {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessPayoutRequest {
    pub idempotency_key: IdempotencyKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<WalletSource>,
    pub destination: BankDestination,
    pub amount: MoneyAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessPayout {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<MoneyAmount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ Express Route ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpressRouteRequest {
    pub idempotency_key: IdempotencyKey,
    pub receipt_address_id: String,
    pub bank_account_id: String,
    pub destination_type: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressRoute {
    pub id: String,
    #[serde(default)]
    pub receipt_address_id: Option<String>,
    #[serde(default)]
    pub bank_account_id: Option<String>,
    #[serde(default)]
    pub destination_type: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============ 通知订阅 ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub subscription_details: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
