//! 账户与转账测试器
//!
//! 把一个或多个 `MintClient` 调用组合成可直接使用的操作：
//! 金额格式化、幂等键生成、"资源已存在"时复用已有资源。

use std::sync::Arc;

use serde::Serialize;

use super::{activity_log::ActivityLog, mint::models::*, mint::MintClient};
use crate::{
    domain::{format_major_units, IdempotencyKey},
    error::MintError,
};

/// 测试流程中可选的自动转账
#[derive(Debug, Clone)]
pub struct AutoTransfer {
    pub address: String,
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFlowReport {
    pub chain: String,
    pub balance: Balance,
    pub deposit_address: DepositAddress,
    pub address_book: Vec<AddressBookRecipient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Payout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_error: Option<String>,
}

#[derive(Clone)]
pub struct AccountTester {
    client: Arc<MintClient>,
    log: ActivityLog,
}

impl AccountTester {
    pub fn new(client: Arc<MintClient>, log: ActivityLog) -> Self {
        Self { client, log }
    }

    pub fn client(&self) -> &MintClient {
        &self.client
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    // ============ 余额与充值地址 ============

    pub async fn check_balance(&self) -> Result<Balance, MintError> {
        self.log.info("💰 Fetching account balance");
        let balance = self.client.get_balance().await?;
        for entry in &balance.available {
            self.log
                .info(format!("   available: {} {}", entry.amount, entry.currency));
        }
        if balance.available.is_empty() {
            self.log.info("   no available balance");
        }
        Ok(balance)
    }

    /// 查找指定链上的充值地址，不存在则创建
    pub async fn get_deposit_address(
        &self,
        chain: &str,
        currency: Option<&str>,
    ) -> Result<DepositAddress, MintError> {
        self.log
            .info(format!("🔍 Looking up deposit address for {}", chain));
        let existing = self.client.list_deposit_addresses().await?;
        if let Some(found) = existing
            .iter()
            .find(|a| deposit_address_matches(a, chain, currency))
        {
            self.log
                .info(format!("   reusing {} address {}", chain, found.address));
            return Ok(found.clone());
        }
        self.create_deposit_address(chain, currency).await
    }

    /// 创建充值地址；已存在时依次取链与币种均匹配、仅链匹配的地址，否则列表第一个
    pub async fn create_deposit_address(
        &self,
        chain: &str,
        currency: Option<&str>,
    ) -> Result<DepositAddress, MintError> {
        let chain = required("chain", chain)?;
        let currency = currency.unwrap_or("USD");
        self.log
            .info(format!("🏦 Creating {} deposit address ({})", chain, currency));

        match self.client.create_deposit_address(chain, currency).await {
            Ok(address) => {
                self.log.info(format!("   created {}", address.address));
                Ok(address)
            }
            Err(err) if err.is_already_exists() => {
                self.log
                    .warn(format!("{} deposit address already exists, reusing it", chain));
                let existing = self.client.list_deposit_addresses().await?;
                existing
                    .iter()
                    .find(|a| deposit_address_matches(a, chain, Some(currency)))
                    .or_else(|| existing.iter().find(|a| deposit_address_matches(a, chain, None)))
                    .or_else(|| existing.first())
                    .cloned()
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    // ============ 地址簿与链上付款 ============

    /// 确保地址簿中存在该地址，付款只能引用地址簿 ID
    pub async fn ensure_address_book_recipient(
        &self,
        address: &str,
        chain: &str,
        address_tag: Option<&str>,
    ) -> Result<AddressBookRecipient, MintError> {
        let address = required("address", address)?;
        let chain = required("chain", chain)?;

        let existing = self.client.list_address_book_recipients().await?;
        if let Some(found) = existing
            .iter()
            .find(|r| r.chain.eq_ignore_ascii_case(chain) && r.address.eq_ignore_ascii_case(address))
        {
            self.log
                .info(format!("📒 Address book already has {} ({})", address, found.id));
            return Ok(found.clone());
        }

        self.log
            .info(format!("📒 Adding {} on {} to the address book", address, chain));
        let request = CreateAddressBookRecipientRequest {
            idempotency_key: IdempotencyKey::generate(),
            chain: chain.to_string(),
            address: address.to_string(),
            address_tag: address_tag.map(str::to_string),
            metadata: RecipientMetadata {
                nickname: Some(format!("{} test recipient", chain)),
                ..Default::default()
            },
        };

        match self.client.create_address_book_recipient(&request).await {
            Ok(recipient) => Ok(recipient),
            Err(err) if err.is_already_exists() => {
                self.log
                    .warn("address book entry already exists, looking it up");
                let existing = self.client.list_address_book_recipients().await?;
                existing
                    .iter()
                    .find(|r| {
                        r.address.eq_ignore_ascii_case(address)
                            && r.chain.eq_ignore_ascii_case(chain)
                    })
                    .or_else(|| existing.iter().find(|r| r.chain.eq_ignore_ascii_case(chain)))
                    .cloned()
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// 向链上地址付款：先登记地址簿，再以地址簿 ID 发起付款
    pub async fn create_payout(
        &self,
        address: &str,
        chain: &str,
        amount: &str,
        currency: Option<&str>,
    ) -> Result<Payout, MintError> {
        let amount = format_major_units(amount)?;
        let currency = currency.unwrap_or("USD");
        let recipient = self
            .ensure_address_book_recipient(address, chain, None)
            .await?;

        self.log.info(format!(
            "💸 Sending {} {} to address book entry {}",
            amount, currency, recipient.id
        ));
        let request = CreatePayoutRequest {
            idempotency_key: IdempotencyKey::generate(),
            source: None,
            destination: PayoutDestination::address_book(&recipient.id),
            amount: MoneyAmount::new(amount, currency),
        };
        let payout = self.client.create_payout(&request).await?;
        self.log.info(format!(
            "   payout {} status {}",
            payout.id,
            payout.status.as_deref().unwrap_or("unknown")
        ));
        Ok(payout)
    }

    pub async fn get_payout_status(&self, id: &str) -> Result<Payout, MintError> {
        self.log.info(format!("🔎 Checking payout {}", id));
        self.client.get_payout(id).await
    }

    // ============ 法币出金 ============

    pub async fn create_business_payout(
        &self,
        destination_type: &str,
        bank_id: &str,
        amount: &str,
        currency: &str,
        wallet_id: Option<&str>,
    ) -> Result<BusinessPayout, MintError> {
        let destination_type = destination_type.trim().to_lowercase();
        if !BUSINESS_PAYOUT_DESTINATIONS.contains(&destination_type.as_str()) {
            return Err(MintError::Validation(format!(
                "unsupported payout destination type '{}', expected one of {}",
                destination_type,
                BUSINESS_PAYOUT_DESTINATIONS.join(", ")
            )));
        }
        let bank_id = required("bank id", bank_id)?;
        let currency = required("currency", currency)?;
        let amount = format_major_units(amount)?;

        self.log.info(format!(
            "🏧 Business payout of {} {} to {} bank {}",
            amount, currency, destination_type, bank_id
        ));
        let request = CreateBusinessPayoutRequest {
            idempotency_key: IdempotencyKey::generate(),
            source: wallet_id.map(WalletSource::wallet),
            destination: BankDestination {
                kind: destination_type,
                id: bank_id.to_string(),
            },
            amount: MoneyAmount::new(amount, currency),
        };
        let payout = self.client.create_business_payout(&request).await?;
        self.log.info(format!(
            "   business payout {} status {}",
            payout.id,
            payout.status.as_deref().unwrap_or("unknown")
        ));
        Ok(payout)
    }

    pub async fn list_business_payouts(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<BusinessPayout>, MintError> {
        let payouts = self.client.list_business_payouts(status).await?;
        self.log
            .info(format!("📋 {} business payouts", payouts.len()));
        Ok(payouts)
    }

    pub async fn get_business_payout(&self, id: &str) -> Result<BusinessPayout, MintError> {
        self.log.info(format!("🔎 Checking business payout {}", id));
        self.client.get_business_payout(id).await
    }

    // ============ 电汇账户 ============

    pub async fn create_wire_account(&self) -> Result<WireBankAccount, MintError> {
        self.log.info("🏦 Creating sandbox wire bank account");
        let account = self
            .client
            .create_wire_bank_account(&CreateWireBankAccountRequest::sandbox_default())
            .await?;
        self.log.info(format!("   wire account {}", account.id));
        Ok(account)
    }

    pub async fn list_wire_accounts(&self) -> Result<Vec<WireBankAccount>, MintError> {
        let accounts = self.client.list_wire_bank_accounts().await?;
        self.log
            .info(format!("📋 {} wire bank accounts", accounts.len()));
        Ok(accounts)
    }

    pub async fn get_wire_instructions(
        &self,
        bank_id: &str,
    ) -> Result<WireInstructions, MintError> {
        self.log
            .info(format!("📄 Fetching wire instructions for {}", bank_id));
        self.client.get_wire_instructions(bank_id, "USD").await
    }

    /// 沙箱模拟电汇入金
    pub async fn mock_wire_deposit(
        &self,
        tracking_ref: &str,
        amount: &str,
        account_number: &str,
    ) -> Result<serde_json::Value, MintError> {
        let tracking_ref = required("tracking ref", tracking_ref)?;
        let account_number = required("account number", account_number)?;
        let amount = format_major_units(amount)?;

        self.log.info(format!(
            "🧪 Mock wire deposit of {} USD with ref {}",
            amount, tracking_ref
        ));
        let request = MockWireDepositRequest {
            tracking_ref: tracking_ref.to_string(),
            amount: MoneyAmount::new(amount, "USD"),
            beneficiary_bank: MockBeneficiaryBank {
                account_number: account_number.to_string(),
            },
        };
        self.client.mock_wire_deposit(&request).await
    }

    // ============ 收款地址与业务转账 ============

    /// 创建收款地址；已存在时复用地址与链都相同的条目
    pub async fn create_recipient_address(
        &self,
        chain: &str,
        address: &str,
        description: &str,
        address_tag: Option<&str>,
        currency: Option<&str>,
    ) -> Result<RecipientAddress, MintError> {
        let chain = required("chain", chain)?;
        let address = required("address", address)?;
        let description = required("description", description)?;

        self.log
            .info(format!("📮 Registering recipient {} on {}", address, chain));
        let request = CreateRecipientAddressRequest {
            idempotency_key: IdempotencyKey::generate(),
            chain: chain.to_string(),
            address: address.to_string(),
            address_tag: address_tag.map(str::to_string),
            currency: currency.unwrap_or("USD").to_string(),
            description: description.to_string(),
        };

        match self.client.create_recipient_address(&request).await {
            Ok(recipient) => {
                self.log.info(format!("   recipient {}", recipient.id));
                Ok(recipient)
            }
            Err(err) if err.is_already_exists() => {
                self.log
                    .warn("recipient address already exists, looking it up");
                let existing = self.client.list_recipient_addresses().await?;
                existing
                    .into_iter()
                    .find(|r| {
                        r.address.eq_ignore_ascii_case(address)
                            && r.chain.eq_ignore_ascii_case(chain)
                    })
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn list_recipient_addresses(&self) -> Result<Vec<RecipientAddress>, MintError> {
        let recipients = self.client.list_recipient_addresses().await?;
        self.log
            .info(format!("📋 {} recipient addresses", recipients.len()));
        Ok(recipients)
    }

    pub async fn get_recipient_address(&self, id: &str) -> Result<RecipientAddress, MintError> {
        self.client.get_recipient_address(id).await
    }

    pub async fn create_business_transfer(
        &self,
        recipient_id: &str,
        amount: &str,
        currency: Option<&str>,
    ) -> Result<BusinessTransfer, MintError> {
        let recipient_id = required("recipient id", recipient_id)?;
        let amount = format_major_units(amount)?;
        let currency = currency.unwrap_or("USD");

        self.log.info(format!(
            "🔗 Business transfer of {} {} to recipient {}",
            amount, currency, recipient_id
        ));
        let request = CreateBusinessTransferRequest {
            idempotency_key: IdempotencyKey::generate(),
            destination: TransferDestination::verified_blockchain(recipient_id),
            amount: MoneyAmount::new(amount, currency),
        };
        let transfer = self.client.create_business_transfer(&request).await?;
        self.log.info(format!(
            "   transfer {} status {}",
            transfer.id,
            transfer.status.as_deref().unwrap_or("unknown")
        ));
        Ok(transfer)
    }

    // ============ 测试流程 ============

    /// 余额 → 充值地址 → 地址簿 → 可选自动转账
    ///
    /// 自动转账失败只记录日志，不中断流程。
    pub async fn run_test_flow(
        &self,
        chain: &str,
        auto_transfer: Option<AutoTransfer>,
    ) -> Result<TestFlowReport, MintError> {
        self.log
            .info(format!("🚀 Starting account test flow on {}", chain));

        self.log.info("Step 1/4: balance");
        let balance = self.check_balance().await.map_err(|e| e.in_step("balance"))?;

        self.log.info("Step 2/4: deposit address");
        let deposit_address = self
            .get_deposit_address(chain, None)
            .await
            .map_err(|e| e.in_step("deposit address"))?;

        self.log.info("Step 3/4: address book");
        let address_book = self
            .client
            .list_address_book_recipients()
            .await
            .map_err(|e| e.in_step("address book"))?;
        self.log
            .info(format!("   {} address book entries", address_book.len()));

        let (transfer, transfer_error) = match auto_transfer {
            Some(plan) => {
                self.log.info("Step 4/4: auto transfer");
                match self
                    .create_payout(&plan.address, chain, &plan.amount, Some(&plan.currency))
                    .await
                {
                    Ok(payout) => (Some(payout), None),
                    Err(e) => {
                        self.log
                            .warn(format!("auto transfer failed, continuing: {}", e));
                        (None, Some(e.to_string()))
                    }
                }
            }
            None => {
                self.log.info("Step 4/4: auto transfer skipped");
                (None, None)
            }
        };

        self.log.info("✅ Account test flow finished");
        Ok(TestFlowReport {
            chain: chain.to_string(),
            balance,
            deposit_address,
            address_book,
            transfer,
            transfer_error,
        })
    }
}

fn deposit_address_matches(address: &DepositAddress, chain: &str, currency: Option<&str>) -> bool {
    address.chain.eq_ignore_ascii_case(chain)
        && currency.map_or(true, |c| address.currency.eq_ignore_ascii_case(c))
}

pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, MintError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MintError::Validation(format!("{} is required", field)));
    }
    Ok(value)
}
