//! 命令行入口
//!
//! 每个子命令对应一个测试器操作，结果以 JSON 返回给 `main` 打印。

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    config::Config,
    error::MintError,
    service::{
        AccountTester, ActivityLog, ExpressRouteTester, FullFlowOptions, MintClient,
        NotificationTester,
    },
};

#[derive(Debug, Parser)]
#[command(
    name = "mint-harness",
    author,
    version,
    about = "Developer harness for the Mint settlement API",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the account balance
    Balance,
    /// Get (or create) a deposit address for a chain
    DepositAddress { chain: Option<String> },
    /// Pay out to an on-chain address through the address book
    Transfer {
        address: String,
        chain: String,
        amount: String,
        currency: Option<String>,
    },
    /// Check a payout
    Status { id: String },
    /// Create a fiat payout to a linked bank account
    BusinessPayout {
        destination_type: String,
        bank_id: String,
        amount: String,
        currency: String,
        wallet_id: Option<String>,
    },
    /// List fiat payouts, optionally filtered by status
    BusinessPayouts { status: Option<String> },
    /// Check a fiat payout
    BusinessStatus { id: String },
    /// Link the sandbox wire bank account
    CreateWireAccount,
    ListWireAccounts,
    /// Simulate an inbound wire (sandbox only)
    MockWire {
        tracking_ref: String,
        amount: String,
        account_number: String,
    },
    GetWireInstructions { id: String },
    /// Register a verified recipient address
    CreateRecipient {
        chain: String,
        address: String,
        description: String,
        address_tag: Option<String>,
    },
    ListRecipients,
    GetRecipient { id: String },
    CreateDepositAddress {
        chain: String,
        currency: Option<String>,
    },
    /// Transfer to a verified recipient address
    BusinessTransfer {
        recipient_id: String,
        amount: String,
        currency: Option<String>,
    },
    /// Balance, deposit address and address book in one pass
    TestFlow { chain: Option<String> },
    /// Express Route steps
    #[command(subcommand)]
    ExpressRoute(ExpressRouteCommand),
    /// Subscribe a webhook endpoint to notifications
    Subscribe { url: String },
    Subscriptions,
    Unsubscribe { id: String },
    /// Validate configuration and ping the API
    ConfigCheck,
    /// Start the dashboard server
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ExpressRouteCommand {
    LinkBank,
    LinkReceipt {
        chain: Option<String>,
        currency: Option<String>,
    },
    MockDeposit {
        tracking_ref: String,
        amount: String,
        account_number: String,
    },
    OnchainDeposit {
        address: String,
        chain: String,
        amount: String,
        currency: Option<String>,
    },
    Transfer {
        recipient_id: String,
        amount: String,
        currency: Option<String>,
    },
    Withdraw {
        bank_id: String,
        amount: String,
        currency: Option<String>,
        destination_type: Option<String>,
    },
    Create {
        receipt_address_id: String,
        bank_id: String,
        destination_type: Option<String>,
        currency: Option<String>,
    },
    /// Run all seven steps
    Run {
        chain: Option<String>,
        amount: Option<String>,
    },
}

fn to_json<T: Serialize>(value: T) -> Result<Value, MintError> {
    Ok(serde_json::to_value(value)?)
}

/// 执行除 `serve` 之外的子命令
pub async fn execute(command: Command, config: &Config) -> Result<Value, MintError> {
    let client = Arc::new(MintClient::new(&config.mint)?);
    execute_with(command, config, client, &ActivityLog::new()).await
}

pub async fn execute_with(
    command: Command,
    config: &Config,
    client: Arc<MintClient>,
    log: &ActivityLog,
) -> Result<Value, MintError> {
    let account = AccountTester::new(client.clone(), log.clone());
    let flow = &config.flow;

    match command {
        Command::Balance => to_json(account.check_balance().await?),
        Command::DepositAddress { chain } => {
            let chain = chain.unwrap_or_else(|| flow.chain.clone());
            to_json(account.get_deposit_address(&chain, None).await?)
        }
        Command::Transfer {
            address,
            chain,
            amount,
            currency,
        } => to_json(
            account
                .create_payout(&address, &chain, &amount, currency.as_deref())
                .await?,
        ),
        Command::Status { id } => to_json(account.get_payout_status(&id).await?),
        Command::BusinessPayout {
            destination_type,
            bank_id,
            amount,
            currency,
            wallet_id,
        } => to_json(
            account
                .create_business_payout(
                    &destination_type,
                    &bank_id,
                    &amount,
                    &currency,
                    wallet_id.as_deref(),
                )
                .await?,
        ),
        Command::BusinessPayouts { status } => {
            to_json(account.list_business_payouts(status.as_deref()).await?)
        }
        Command::BusinessStatus { id } => to_json(account.get_business_payout(&id).await?),
        Command::CreateWireAccount => to_json(account.create_wire_account().await?),
        Command::ListWireAccounts => to_json(account.list_wire_accounts().await?),
        Command::MockWire {
            tracking_ref,
            amount,
            account_number,
        } => {
            account
                .mock_wire_deposit(&tracking_ref, &amount, &account_number)
                .await
        }
        Command::GetWireInstructions { id } => to_json(account.get_wire_instructions(&id).await?),
        Command::CreateRecipient {
            chain,
            address,
            description,
            address_tag,
        } => to_json(
            account
                .create_recipient_address(
                    &chain,
                    &address,
                    &description,
                    address_tag.as_deref(),
                    None,
                )
                .await?,
        ),
        Command::ListRecipients => to_json(account.list_recipient_addresses().await?),
        Command::GetRecipient { id } => to_json(account.get_recipient_address(&id).await?),
        Command::CreateDepositAddress { chain, currency } => to_json(
            account
                .create_deposit_address(&chain, currency.as_deref())
                .await?,
        ),
        Command::BusinessTransfer {
            recipient_id,
            amount,
            currency,
        } => to_json(
            account
                .create_business_transfer(&recipient_id, &amount, currency.as_deref())
                .await?,
        ),
        Command::TestFlow { chain } => {
            let chain = chain.unwrap_or_else(|| flow.chain.clone());
            to_json(account.run_test_flow(&chain, None).await?)
        }
        Command::ExpressRoute(step) => {
            let tester = ExpressRouteTester::new(account, config.polling.policy());
            express_route(step, &tester, config).await
        }
        Command::Subscribe { url } => {
            to_json(NotificationTester::new(client, log.clone()).subscribe(&url).await?)
        }
        Command::Subscriptions => to_json(NotificationTester::new(client, log.clone()).list().await?),
        Command::Unsubscribe { id } => {
            NotificationTester::new(client, log.clone())
                .unsubscribe(&id)
                .await
        }
        Command::ConfigCheck => {
            let ping = client.ping().await?;
            log.info("✅ Mint API reachable");
            Ok(json!({ "config": config.redacted(), "ping": ping }))
        }
        Command::Serve => Err(MintError::Validation(
            "serve is handled by the binary entry point".into(),
        )),
    }
}

async fn express_route(
    step: ExpressRouteCommand,
    tester: &ExpressRouteTester,
    config: &Config,
) -> Result<Value, MintError> {
    match step {
        ExpressRouteCommand::LinkBank => to_json(tester.link_bank_account().await?),
        ExpressRouteCommand::LinkReceipt { chain, currency } => {
            let chain = chain.unwrap_or_else(|| config.flow.chain.clone());
            to_json(
                tester
                    .link_receipt_address(&chain, currency.as_deref())
                    .await?,
            )
        }
        ExpressRouteCommand::MockDeposit {
            tracking_ref,
            amount,
            account_number,
        } => {
            tester
                .mock_deposit(&tracking_ref, &amount, &account_number)
                .await
        }
        ExpressRouteCommand::OnchainDeposit {
            address,
            chain,
            amount,
            currency,
        } => {
            tester
                .onchain_deposit(&address, &chain, &amount, currency.as_deref())
                .await
        }
        ExpressRouteCommand::Transfer {
            recipient_id,
            amount,
            currency,
        } => to_json(
            tester
                .transfer(&recipient_id, &amount, currency.as_deref())
                .await?,
        ),
        ExpressRouteCommand::Withdraw {
            bank_id,
            amount,
            currency,
            destination_type,
        } => to_json(
            tester
                .withdraw(
                    &bank_id,
                    &amount,
                    currency.as_deref(),
                    destination_type.as_deref(),
                )
                .await?,
        ),
        ExpressRouteCommand::Create {
            receipt_address_id,
            bank_id,
            destination_type,
            currency,
        } => to_json(
            tester
                .create_route(
                    &receipt_address_id,
                    &bank_id,
                    destination_type.as_deref(),
                    currency.as_deref(),
                )
                .await?,
        ),
        ExpressRouteCommand::Run { chain, amount } => {
            let mut opts = FullFlowOptions::from_config(config);
            if let Some(chain) = chain {
                opts.chain = chain;
            }
            if let Some(amount) = amount {
                opts.amount = amount;
            }
            to_json(tester.run_full_flow(&opts).await?)
        }
    }
}
