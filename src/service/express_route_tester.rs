//! Express Route 测试器
//!
//! 七步流程：绑定银行 → 绑定收款地址 → 模拟电汇 → 模拟链上入金 →
//! 链上转出 → 法币出金 → 创建 Express Route。
//! 每一步的输出 ID 作为下一步的输入；依赖远端最终一致的步骤通过有界轮询等待。

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::{
    account_tester::{required, AccountTester},
    activity_log::ActivityLog,
    mint::models::*,
};
use crate::{
    config::Config,
    domain::{format_major_units, parse_amount, poll_until, IdempotencyKey, PollPolicy},
    error::MintError,
};

/// 完整流程参数
#[derive(Debug, Clone)]
pub struct FullFlowOptions {
    pub chain: String,
    pub currency: String,
    pub amount: String,
    pub destination_type: String,
    pub recipient_address: String,
}

impl FullFlowOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chain: config.flow.chain.clone(),
            currency: config.flow.currency.clone(),
            amount: config.flow.amount.clone(),
            destination_type: config.flow.destination_type.clone(),
            recipient_address: config.flow.recipient_address.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullFlowReport {
    pub bank_account: WireBankAccount,
    pub receipt_address: DepositAddress,
    pub wire_instructions: WireInstructions,
    pub wire_deposit: Value,
    pub onchain_deposit: Value,
    pub recipient: RecipientAddress,
    pub transfer: BusinessTransfer,
    pub payout: BusinessPayout,
    pub express_route: ExpressRoute,
    pub final_balance: Balance,
}

#[derive(Clone)]
pub struct ExpressRouteTester {
    account: AccountTester,
    poll: PollPolicy,
}

impl ExpressRouteTester {
    pub fn new(account: AccountTester, poll: PollPolicy) -> Self {
        Self { account, poll }
    }

    fn log(&self) -> &ActivityLog {
        self.account.log()
    }

    /// 步骤 1：绑定电汇银行账户，已存在时复用列表中的第一个
    pub async fn link_bank_account(&self) -> Result<WireBankAccount, MintError> {
        self.log().info("🏦 Linking sandbox wire bank account");
        let request = CreateWireBankAccountRequest::sandbox_default();
        match self.account.client().create_wire_bank_account(&request).await {
            Ok(account) => {
                self.log().info(format!("   linked bank {}", account.id));
                Ok(account)
            }
            Err(err) if err.is_already_exists() => {
                self.log()
                    .warn("bank account already linked, reusing the first listed account");
                let accounts = self.account.client().list_wire_bank_accounts().await?;
                let first = accounts.into_iter().next().ok_or(err)?;
                self.log().info(format!("   reusing bank {}", first.id));
                Ok(first)
            }
            Err(err) => Err(err),
        }
    }

    /// 步骤 2：绑定收款地址
    pub async fn link_receipt_address(
        &self,
        chain: &str,
        currency: Option<&str>,
    ) -> Result<DepositAddress, MintError> {
        self.log()
            .info(format!("📥 Linking {} receipt address", chain));
        self.account.create_deposit_address(chain, currency).await
    }

    /// 步骤 3：模拟电汇入金
    pub async fn mock_deposit(
        &self,
        tracking_ref: &str,
        amount: &str,
        account_number: &str,
    ) -> Result<Value, MintError> {
        self.account
            .mock_wire_deposit(tracking_ref, amount, account_number)
            .await
    }

    /// 步骤 4：模拟链上入金到收款地址
    pub async fn onchain_deposit(
        &self,
        address: &str,
        chain: &str,
        amount: &str,
        currency: Option<&str>,
    ) -> Result<Value, MintError> {
        let address = required("address", address)?;
        let chain = required("chain", chain)?;
        let amount = format_major_units(amount)?;
        let currency = currency.unwrap_or("USD");

        self.log().info(format!(
            "🧪 Mock on-chain deposit of {} {} to {} on {}",
            amount, currency, address, chain
        ));
        let request = MockOnchainDepositRequest {
            idempotency_key: IdempotencyKey::generate(),
            address: address.to_string(),
            address_tag: None,
            chain: chain.to_string(),
            amount: MoneyAmount::new(amount, currency),
        };
        self.account.client().mock_onchain_deposit(&request).await
    }

    /// 步骤 5：链上转出到已验证收款地址
    pub async fn transfer(
        &self,
        recipient_id: &str,
        amount: &str,
        currency: Option<&str>,
    ) -> Result<BusinessTransfer, MintError> {
        self.account
            .create_business_transfer(recipient_id, amount, currency)
            .await
    }

    /// 步骤 6：法币出金到银行账户
    pub async fn withdraw(
        &self,
        bank_id: &str,
        amount: &str,
        currency: Option<&str>,
        destination_type: Option<&str>,
    ) -> Result<BusinessPayout, MintError> {
        self.account
            .create_business_payout(
                destination_type.unwrap_or("wire"),
                bank_id,
                amount,
                currency.unwrap_or("USD"),
                None,
            )
            .await
    }

    /// 步骤 7：创建 Express Route；已存在时复用收款地址与银行都相同的路由，否则第一个
    pub async fn create_route(
        &self,
        receipt_address_id: &str,
        bank_id: &str,
        destination_type: Option<&str>,
        currency: Option<&str>,
    ) -> Result<ExpressRoute, MintError> {
        let receipt_address_id = required("receipt address id", receipt_address_id)?;
        let bank_id = required("bank id", bank_id)?;

        self.log().info(format!(
            "🛣️ Creating express route {} → {}",
            receipt_address_id, bank_id
        ));
        let request = CreateExpressRouteRequest {
            idempotency_key: IdempotencyKey::generate(),
            receipt_address_id: receipt_address_id.to_string(),
            bank_account_id: bank_id.to_string(),
            destination_type: destination_type.unwrap_or("wire").to_string(),
            currency: currency.unwrap_or("USD").to_string(),
        };

        match self.account.client().create_express_route(&request).await {
            Ok(route) => {
                self.log().info(format!("   express route {}", route.id));
                Ok(route)
            }
            Err(err) if err.is_already_exists() => {
                self.log()
                    .warn("express route already exists, looking it up");
                let routes = self.account.client().list_express_routes().await?;
                let matching = routes.iter().position(|r| {
                    r.receipt_address_id.as_deref() == Some(receipt_address_id)
                        && r.bank_account_id.as_deref() == Some(bank_id)
                });
                match matching {
                    Some(index) => Ok(routes[index].clone()),
                    None => routes.into_iter().next().ok_or(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// 等待电汇指引可用，并检查模拟入金所需字段
    pub async fn wait_for_wire_instructions(
        &self,
        bank_id: &str,
        currency: &str,
    ) -> Result<WireInstructions, MintError> {
        let client = self.account.client();
        let instructions = poll_until(&self.poll, "wire instructions", || async move {
            match client.get_wire_instructions(bank_id, currency).await {
                Ok(instructions) => Ok(Some(instructions)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await?;

        if instructions.tracking_ref().is_none() {
            return Err(MintError::Validation(
                "wire instructions are missing trackingRef".into(),
            ));
        }
        if instructions.beneficiary_account_number().is_none() {
            return Err(MintError::Validation(
                "wire instructions are missing beneficiaryBank.accountNumber".into(),
            ));
        }
        Ok(instructions)
    }

    /// 等待可用余额至少达到 `target`
    pub async fn wait_for_balance(
        &self,
        currency: &str,
        target: Decimal,
    ) -> Result<Balance, MintError> {
        self.log()
            .info(format!("⏳ Waiting for {} balance ≥ {}", currency, target));
        let client = self.account.client();
        let balance = poll_until(&self.poll, "balance update", || async move {
            let balance = client.get_balance().await?;
            if available(&balance, currency) >= target {
                Ok(Some(balance))
            } else {
                Ok(None)
            }
        })
        .await?;
        self.log().info(format!(
            "   {} balance now {}",
            currency,
            available(&balance, currency)
        ));
        Ok(balance)
    }

    async fn current_available(&self, currency: &str) -> Result<Decimal, MintError> {
        let balance = self.account.client().get_balance().await?;
        Ok(available(&balance, currency))
    }

    /// 完整七步流程，任一必需步骤失败即中止，错误中带步骤名
    pub async fn run_full_flow(&self, opts: &FullFlowOptions) -> Result<FullFlowReport, MintError> {
        let amount = format_major_units(&opts.amount)?;
        let increment = parse_amount(&amount)?;
        self.log().info(format!(
            "🚀 Starting express route flow: {} {} on {}",
            amount, opts.currency, opts.chain
        ));

        self.log().info("Step 1/7: link bank account");
        let bank_account = self
            .link_bank_account()
            .await
            .map_err(|e| e.in_step("link bank account"))?;

        self.log().info("Step 2/7: link receipt address");
        let receipt_address = self
            .link_receipt_address(&opts.chain, None)
            .await
            .map_err(|e| e.in_step("link receipt address"))?;

        self.log().info("Step 3/7: mock wire deposit");
        let (wire_instructions, wire_deposit) = self
            .fund_by_wire(&bank_account.id, &amount, &opts.currency, increment)
            .await
            .map_err(|e| e.in_step("mock wire deposit"))?;

        self.log().info("Step 4/7: mock on-chain deposit");
        let (onchain_deposit, after_deposit) = self
            .fund_onchain(&receipt_address, &amount, &opts.currency, increment)
            .await
            .map_err(|e| e.in_step("mock on-chain deposit"))?;

        self.log().info("Step 5/7: on-chain transfer");
        let recipient = self
            .account
            .create_recipient_address(
                &opts.chain,
                &opts.recipient_address,
                "Express route test recipient",
                None,
                Some(&opts.currency),
            )
            .await
            .map_err(|e| e.in_step("on-chain transfer"))?;
        let transfer = self
            .transfer(&recipient.id, &amount, Some(&opts.currency))
            .await
            .map_err(|e| e.in_step("on-chain transfer"))?;

        self.log().info("Step 6/7: fiat withdrawal");
        let payout = self
            .withdraw(
                &bank_account.id,
                &amount,
                Some(&opts.currency),
                Some(&opts.destination_type),
            )
            .await
            .map_err(|e| e.in_step("fiat withdrawal"))?;

        self.log().info("Step 7/7: express route");
        let receipt_id = receipt_address.id.clone().ok_or_else(|| {
            MintError::Validation("receipt address has no id".into()).in_step("express route")
        })?;
        let express_route = self
            .create_route(
                &receipt_id,
                &bank_account.id,
                Some(&opts.destination_type),
                Some(&opts.currency),
            )
            .await
            .map_err(|e| e.in_step("express route"))?;

        self.log().info("✅ Express route flow finished");
        Ok(FullFlowReport {
            bank_account,
            receipt_address,
            wire_instructions,
            wire_deposit,
            onchain_deposit,
            recipient,
            transfer,
            payout,
            express_route,
            final_balance: after_deposit,
        })
    }

    async fn fund_by_wire(
        &self,
        bank_id: &str,
        amount: &str,
        currency: &str,
        increment: Decimal,
    ) -> Result<(WireInstructions, Value), MintError> {
        let instructions = self.wait_for_wire_instructions(bank_id, currency).await?;
        let tracking_ref = instructions.tracking_ref().unwrap_or_default().to_string();
        let account_number = instructions
            .beneficiary_account_number()
            .unwrap_or_default()
            .to_string();

        let baseline = self.current_available(currency).await?;
        let deposit = self
            .mock_deposit(&tracking_ref, amount, &account_number)
            .await?;
        self.wait_for_balance(currency, baseline + increment).await?;
        Ok((instructions, deposit))
    }

    async fn fund_onchain(
        &self,
        receipt: &DepositAddress,
        amount: &str,
        currency: &str,
        increment: Decimal,
    ) -> Result<(Value, Balance), MintError> {
        let baseline = self.current_available(currency).await?;
        let deposit = self
            .onchain_deposit(&receipt.address, &receipt.chain, amount, Some(currency))
            .await?;
        let balance = self.wait_for_balance(currency, baseline + increment).await?;
        Ok((deposit, balance))
    }
}

fn available(balance: &Balance, currency: &str) -> Decimal {
    balance
        .available_in(currency)
        .and_then(|raw| raw.trim().parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_defaults_to_zero() {
        let balance: Balance = serde_json::from_value(serde_json::json!({
            "available": [{"amount": "12.50", "currency": "USD"}],
            "unsettled": []
        }))
        .unwrap();
        assert_eq!(available(&balance, "USD"), Decimal::new(1250, 2));
        assert_eq!(available(&balance, "EUR"), Decimal::ZERO);
    }

    #[test]
    fn test_options_from_config_defaults() {
        let config: Config = toml::from_str("[mint]\napi_key = \"k\"\nenvironment = \"sandbox\"\n").unwrap();
        let opts = FullFlowOptions::from_config(&config);
        assert_eq!(opts.chain, "ETH");
        assert_eq!(opts.amount, "10.00");
        assert_eq!(opts.destination_type, "wire");
    }
}
