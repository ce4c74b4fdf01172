//! 测试器流程测试（脚本化传输层）

mod common;

use std::time::Duration;

use common::*;
use mint_harness::{
    domain::PollPolicy,
    error::MintError,
    service::{
        mint::HttpMethod, AccountTester, ActivityLog, AutoTransfer, ExpressRouteTester,
        FullFlowOptions,
    },
};
use serde_json::json;

const DEPOSIT_PATH: &str = "/v1/wallets/addresses/deposit";
const WIRES_PATH: &str = "/v1/businessAccount/banks/wires";
const MOCK_WIRE_PATH: &str = "/v1/mocks/payments/wire";

fn fast_poll() -> PollPolicy {
    PollPolicy {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        timeout: Duration::from_millis(80),
    }
}

fn account(transport: &std::sync::Arc<ScriptedTransport>) -> AccountTester {
    AccountTester::new(client(transport), ActivityLog::new())
}

fn express(transport: &std::sync::Arc<ScriptedTransport>) -> ExpressRouteTester {
    ExpressRouteTester::new(account(transport), fast_poll())
}

fn flow_options() -> FullFlowOptions {
    FullFlowOptions::from_config(&test_config())
}

#[tokio::test]
async fn test_each_create_uses_a_fresh_idempotency_key() {
    let transport = ScriptedTransport::new();
    transport.on(
        HttpMethod::Post,
        DEPOSIT_PATH,
        201,
        data(json!({"id": "addr-1", "address": "0xA", "chain": "ETH", "currency": "USD"})),
    );
    let tester = account(&transport);

    tester.create_deposit_address("ETH", None).await.unwrap();
    tester.create_deposit_address("ETH", None).await.unwrap();

    let bodies = transport.bodies_sent_to(HttpMethod::Post, DEPOSIT_PATH);
    assert_eq!(bodies.len(), 2);
    let first = bodies[0]["idempotencyKey"].as_str().unwrap();
    let second = bodies[1]["idempotencyKey"].as_str().unwrap();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_duplicate_deposit_address_returns_original() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            HttpMethod::Post,
            DEPOSIT_PATH,
            201,
            data(json!({"id": "addr-1", "address": "0xA", "chain": "ETH", "currency": "USD"})),
        )
        .on(HttpMethod::Post, DEPOSIT_PATH, 400, duplicate_error())
        .on(
            HttpMethod::Get,
            DEPOSIT_PATH,
            200,
            data(json!([
                {"id": "addr-0", "address": "SoLaNa", "chain": "SOL", "currency": "USD"},
                {"id": "addr-1", "address": "0xA", "chain": "ETH", "currency": "USD"}
            ])),
        );
    let tester = account(&transport);

    let created = tester.create_deposit_address("ETH", None).await.unwrap();
    let again = tester.create_deposit_address("ETH", None).await.unwrap();

    assert_eq!(created.id.as_deref(), Some("addr-1"));
    assert_eq!(again.id, created.id);
    assert_eq!(again.address, "0xA");
}

#[tokio::test]
async fn test_link_bank_conflict_reuses_first_listed_account() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, WIRES_PATH, 409, json!({"code": 0, "message": "conflict"}))
        .on(
            HttpMethod::Get,
            WIRES_PATH,
            200,
            data(json!([{"id": "bank-A"}, {"id": "bank-B"}])),
        );

    let bank = express(&transport).link_bank_account().await.unwrap();
    assert_eq!(bank.id, "bank-A");
}

#[tokio::test]
async fn test_link_bank_conflict_with_empty_list_keeps_error() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, WIRES_PATH, 409, json!({"code": 0, "message": "conflict"}))
        .on(HttpMethod::Get, WIRES_PATH, 200, data(json!([])));

    let err = express(&transport).link_bank_account().await.unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_payout_goes_through_address_book_entry() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Get, "/v1/addressBook/recipients", 200, data(json!([])))
        .on(
            HttpMethod::Post,
            "/v1/addressBook/recipients",
            201,
            data(json!({
                "id": "b8627ae8-732b-4d25-b947-1df8f4007a29",
                "chain": "ETH",
                "address": "0x8381470ED67C3802402dbbFa0058E8871F017A6F"
            })),
        )
        .on(
            HttpMethod::Post,
            "/v1/payouts",
            201,
            data(json!({"id": "po-1", "status": "pending"})),
        );
    let tester = account(&transport);

    let payout = tester
        .create_payout("0x8381470ED67C3802402dbbFa0058E8871F017A6F", "ETH", "1.005", None)
        .await
        .unwrap();
    assert_eq!(payout.id, "po-1");

    let bodies = transport.bodies_sent_to(HttpMethod::Post, "/v1/payouts");
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["destination"]["type"], "address_book");
    assert_eq!(bodies[0]["destination"]["id"], "b8627ae8-732b-4d25-b947-1df8f4007a29");
    assert_eq!(bodies[0]["amount"]["amount"], "1.01");
}

#[tokio::test]
async fn test_malformed_amount_is_rejected_before_any_call() {
    let transport = ScriptedTransport::new();
    let tester = account(&transport);

    let err = tester
        .create_payout("0xabc", "ETH", "-3", None)
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::Validation(_)));

    let err = tester
        .create_business_payout("carrier-pigeon", "bank-1", "5", "USD", None)
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::Validation(_)));

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_test_flow_continues_after_auto_transfer_failure() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Get, "/v1/balances", 200, balance("3.00"))
        .on(
            HttpMethod::Get,
            DEPOSIT_PATH,
            200,
            data(json!([{"id": "addr-1", "address": "0xA", "chain": "ETH", "currency": "USD"}])),
        )
        .on(HttpMethod::Get, "/v1/addressBook/recipients", 200, data(json!([])))
        .on(
            HttpMethod::Post,
            "/v1/addressBook/recipients",
            500,
            json!({"code": 0, "message": "internal"}),
        );
    let log = ActivityLog::new();
    let tester = AccountTester::new(client(&transport), log.clone());

    let report = tester
        .run_test_flow(
            "ETH",
            Some(AutoTransfer {
                address: "0xdead".into(),
                amount: "1".into(),
                currency: "USD".into(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(report.deposit_address.address, "0xA");
    assert!(report.transfer.is_none());
    assert!(report.transfer_error.is_some());
    assert!(log.entries().iter().any(|line| line.contains("auto transfer failed")));
    assert!(log.entries().iter().any(|line| line.contains("finished")));
}

#[tokio::test]
async fn test_full_flow_aborts_when_instructions_are_incomplete() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, WIRES_PATH, 201, data(json!({"id": "bank-1"})))
        .on(
            HttpMethod::Post,
            DEPOSIT_PATH,
            201,
            data(json!({"id": "addr-1", "address": "0xR", "chain": "ETH", "currency": "USD"})),
        )
        .on(
            HttpMethod::Get,
            "/v1/businessAccount/banks/wires/bank-1/instructions",
            200,
            data(json!({"trackingRef": "CIR1", "beneficiaryBank": {"name": "Sandbox Bank"}})),
        );

    let err = express(&transport)
        .run_full_flow(&flow_options())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), MintError::Validation(_)));
    assert!(err.to_string().contains("mock wire deposit"));
    assert_eq!(transport.calls_to(HttpMethod::Post, MOCK_WIRE_PATH), 0);
}

#[tokio::test]
async fn test_balance_wait_times_out() {
    let transport = ScriptedTransport::new();
    transport.on(HttpMethod::Get, "/v1/balances", 200, balance("0.00"));

    let err = express(&transport)
        .wait_for_balance("USD", "10".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, MintError::Timeout { .. }));
}

#[tokio::test]
async fn test_full_flow_runs_all_steps_in_order() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, WIRES_PATH, 201, data(json!({"id": "bank-1"})))
        .on(
            HttpMethod::Post,
            DEPOSIT_PATH,
            201,
            data(json!({"id": "addr-1", "address": "0xR", "chain": "ETH", "currency": "USD"})),
        )
        .on(
            HttpMethod::Get,
            "/v1/businessAccount/banks/wires/bank-1/instructions",
            200,
            data(json!({"trackingRef": "CIR1", "beneficiaryBank": {"accountNumber": "12340010"}})),
        )
        .on(HttpMethod::Get, "/v1/balances", 200, balance("0.00"))
        .on(HttpMethod::Get, "/v1/balances", 200, balance("10.00"))
        .on(HttpMethod::Get, "/v1/balances", 200, balance("10.00"))
        .on(HttpMethod::Get, "/v1/balances", 200, balance("20.00"))
        .on(HttpMethod::Post, MOCK_WIRE_PATH, 201, data(json!({"status": "pending"})))
        .on(HttpMethod::Post, "/v1/mocks/blockchain/deposits", 201, data(json!({})))
        .on(
            HttpMethod::Post,
            "/v1/businessAccount/wallets/addresses/recipient",
            201,
            data(json!({"id": "rcp-1", "chain": "ETH", "address": "0x8381470ED67C3802402dbbFa0058E8871F017A6F"})),
        )
        .on(
            HttpMethod::Post,
            "/v1/businessAccount/transfers",
            201,
            data(json!({"id": "tr-1", "status": "pending"})),
        )
        .on(
            HttpMethod::Post,
            "/v1/businessAccount/payouts",
            201,
            data(json!({"id": "po-1", "status": "pending"})),
        )
        .on(
            HttpMethod::Post,
            "/v1/businessAccount/expressRoutes",
            201,
            data(json!({"id": "er-1", "receiptAddressId": "addr-1", "bankAccountId": "bank-1"})),
        );

    let report = express(&transport)
        .run_full_flow(&flow_options())
        .await
        .unwrap();

    assert_eq!(report.bank_account.id, "bank-1");
    assert_eq!(report.transfer.id, "tr-1");
    assert_eq!(report.payout.id, "po-1");
    assert_eq!(report.express_route.id, "er-1");

    let wire = transport.bodies_sent_to(HttpMethod::Post, MOCK_WIRE_PATH);
    assert_eq!(wire[0]["trackingRef"], "CIR1");
    assert_eq!(wire[0]["beneficiaryBank"]["accountNumber"], "12340010");
    assert_eq!(wire[0]["amount"]["amount"], "10.00");

    let onchain = transport.bodies_sent_to(HttpMethod::Post, "/v1/mocks/blockchain/deposits");
    assert_eq!(onchain[0]["address"], "0xR");

    let transfer = transport.bodies_sent_to(HttpMethod::Post, "/v1/businessAccount/transfers");
    assert_eq!(transfer[0]["destination"]["addressId"], "rcp-1");

    let route = transport.bodies_sent_to(HttpMethod::Post, "/v1/businessAccount/expressRoutes");
    assert_eq!(route[0]["receiptAddressId"], "addr-1");
    assert_eq!(route[0]["bankAccountId"], "bank-1");
}

#[tokio::test]
async fn test_express_route_conflict_prefers_matching_route() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            HttpMethod::Post,
            "/v1/businessAccount/expressRoutes",
            400,
            duplicate_error(),
        )
        .on(
            HttpMethod::Get,
            "/v1/businessAccount/expressRoutes",
            200,
            data(json!([
                {"id": "er-other", "receiptAddressId": "addr-9", "bankAccountId": "bank-9"},
                {"id": "er-1", "receiptAddressId": "addr-1", "bankAccountId": "bank-1"}
            ])),
        );

    let route = express(&transport)
        .create_route("addr-1", "bank-1", None, None)
        .await
        .unwrap();
    assert_eq!(route.id, "er-1");
}

#[tokio::test]
async fn test_full_flow_aborts_without_tracking_ref() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, WIRES_PATH, 201, data(json!({"id": "bank-1"})))
        .on(
            HttpMethod::Post,
            DEPOSIT_PATH,
            201,
            data(json!({"id": "addr-1", "address": "0xR", "chain": "ETH", "currency": "USD"})),
        )
        .on(
            HttpMethod::Get,
            "/v1/businessAccount/banks/wires/bank-1/instructions",
            200,
            data(json!({"beneficiaryBank": {"accountNumber": "12340010"}})),
        );

    let err = express(&transport)
        .run_full_flow(&flow_options())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), MintError::Validation(_)));
    assert!(err.to_string().contains("mock wire deposit"));
    assert_eq!(transport.calls_to(HttpMethod::Post, MOCK_WIRE_PATH), 0);
}

#[tokio::test]
async fn test_duplicate_deposit_address_prefers_same_chain_over_first() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, DEPOSIT_PATH, 400, duplicate_error())
        .on(
            HttpMethod::Get,
            DEPOSIT_PATH,
            200,
            data(json!([
                {"id": "sol", "address": "SoLaNa", "chain": "SOL", "currency": "USD"},
                {"id": "eth-eur", "address": "0xE", "chain": "ETH", "currency": "EUR"}
            ])),
        );

    let address = account(&transport)
        .create_deposit_address("ETH", None)
        .await
        .unwrap();
    assert_eq!(address.chain, "ETH");
    assert_eq!(address.id.as_deref(), Some("eth-eur"));
}

const ADDRESS_BOOK_PATH: &str = "/v1/addressBook/recipients";
const RECIPIENTS_PATH: &str = "/v1/businessAccount/wallets/addresses/recipient";

#[tokio::test]
async fn test_address_book_conflict_reuses_same_address() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Get, ADDRESS_BOOK_PATH, 200, data(json!([])))
        .on(
            HttpMethod::Get,
            ADDRESS_BOOK_PATH,
            200,
            data(json!([
                {"id": "ab-other", "chain": "ETH", "address": "0xother"},
                {"id": "ab-1", "chain": "ETH", "address": "0xABC"}
            ])),
        )
        .on(HttpMethod::Post, ADDRESS_BOOK_PATH, 400, duplicate_error());

    let entry = account(&transport)
        .ensure_address_book_recipient("0xabc", "ETH", None)
        .await
        .unwrap();
    assert_eq!(entry.id, "ab-1");
    assert_eq!(transport.calls_to(HttpMethod::Post, ADDRESS_BOOK_PATH), 1);
}

#[tokio::test]
async fn test_address_book_conflict_falls_back_to_same_chain() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Get, ADDRESS_BOOK_PATH, 200, data(json!([])))
        .on(
            HttpMethod::Get,
            ADDRESS_BOOK_PATH,
            200,
            data(json!([
                {"id": "ab-sol", "chain": "SOL", "address": "SoLaNa"},
                {"id": "ab-eth", "chain": "ETH", "address": "0xother"}
            ])),
        )
        .on(HttpMethod::Post, ADDRESS_BOOK_PATH, 409, json!({"code": 0, "message": "exists"}));

    let entry = account(&transport)
        .ensure_address_book_recipient("0xabc", "ETH", None)
        .await
        .unwrap();
    assert_eq!(entry.id, "ab-eth");
}

#[tokio::test]
async fn test_address_book_conflict_without_match_keeps_error() {
    let transport = ScriptedTransport::new();
    transport
        .on(
            HttpMethod::Get,
            ADDRESS_BOOK_PATH,
            200,
            data(json!([{"id": "ab-sol", "chain": "SOL", "address": "SoLaNa"}])),
        )
        .on(HttpMethod::Post, ADDRESS_BOOK_PATH, 400, duplicate_error());

    let err = account(&transport)
        .ensure_address_book_recipient("0xabc", "ETH", None)
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_recipient_conflict_reuses_same_address_and_chain() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, RECIPIENTS_PATH, 400, duplicate_error())
        .on(
            HttpMethod::Get,
            RECIPIENTS_PATH,
            200,
            data(json!([
                {"id": "rcp-sol", "chain": "SOL", "address": "0xABC"},
                {"id": "rcp-1", "chain": "ETH", "address": "0xABC"}
            ])),
        );

    let recipient = account(&transport)
        .create_recipient_address("ETH", "0xabc", "test", None, None)
        .await
        .unwrap();
    assert_eq!(recipient.id, "rcp-1");
}

#[tokio::test]
async fn test_recipient_conflict_without_exact_match_keeps_error() {
    let transport = ScriptedTransport::new();
    transport
        .on(HttpMethod::Post, RECIPIENTS_PATH, 409, json!({"code": 0, "message": "exists"}))
        .on(
            HttpMethod::Get,
            RECIPIENTS_PATH,
            200,
            data(json!([{"id": "rcp-2", "chain": "ETH", "address": "0xother"}])),
        );

    let err = account(&transport)
        .create_recipient_address("ETH", "0xabc", "test", None, None)
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
}
