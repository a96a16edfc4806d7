//! Integration tests for the user flows through the public API
//!
//! This test validates:
//! - Configuration parsed from TOML drives the transaction builder
//! - Fee oracle failures fall back, or fail in strict mode
//! - On-chain program errors and expired blockhashes surface distinctly

use launchpad_client::config::Config;
use launchpad_client::flows::{FlowContext, PurchaseFlow};
use launchpad_client::test_utils::{decompile, MockChainRpc, MockConfirmation, MockFeeOracle, MockWallet};
use launchpad_client::tx_builder::{PriorityFeeOracle, TransactionBuilder, TransactionBuilderError};
use launchpad_client::wallet::WalletSigner;
use launchpad_client::{derive_status, LaunchpadError, ProjectRecord, Pubkey, Status};
use solana_sdk::compute_budget;
use std::sync::Arc;

const DEADLINE: i64 = 1_700_000_000;
const NOW: i64 = DEADLINE - 3_600;

const CONFIG: &str = r#"
[rpc]
url = "http://127.0.0.1:8899"

[fees]
priority_level = "High"
fallback_micro_lamports = 42000

[confirmation]
poll_interval_ms = 1

[wallet]
keypair_path = "/dev/null"
"#;

fn purchase_flow(config: &Config, rpc: Arc<MockChainRpc>, oracle: Arc<dyn PriorityFeeOracle>) -> PurchaseFlow {
    let builder = TransactionBuilder::from_config(rpc, oracle, config);
    PurchaseFlow::new(FlowContext::new(builder, config.programs.resolve().unwrap()))
}

fn open_presale() -> ProjectRecord {
    ProjectRecord {
        id: Pubkey::new_unique(),
        token_mint: Pubkey::new_unique(),
        quote_mint: Pubkey::new_unique(),
        authority: Pubkey::new_unique(),
        lp_mint: None,
        liquidity_collected: 0,
        presale_target: 1_000_000,
        total_supply: 10_000_000,
        vested_supply: 5_000_000,
        amount_withdrawn: 0,
        amount_claimed: 0,
        presale_time_limit: Some(DEADLINE),
        vesting_period: 3_600,
        vesting_started_at: None,
        token_decimals: 6,
        quote_decimals: 6,
    }
}

/// Price carried by the SetComputeUnitPrice instruction of a sent transaction
fn sent_unit_price(rpc: &MockChainRpc) -> Option<u64> {
    let tx = rpc.sent_transactions().pop()?;
    decompile(&tx)
        .into_iter()
        .find(|ix| ix.program_id == compute_budget::id() && ix.data.first() == Some(&3))
        .map(|ix| u64::from_le_bytes(ix.data[1..9].try_into().unwrap()))
}

#[tokio::test]
async fn test_oracle_failure_uses_configured_fallback() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let rpc = Arc::new(MockChainRpc::new());
    let flow = purchase_flow(&config, rpc.clone(), Arc::new(MockFeeOracle::failing()));
    let record = open_presale();
    assert_eq!(derive_status(&record, NOW), Some(Status::PresaleInProgress));

    let confirmed = flow
        .purchase(&record, &MockWallet::new(), 1_000, 10_000, NOW)
        .await
        .unwrap();

    assert_eq!(confirmed.compute_unit_price, 42_000);
    assert_eq!(sent_unit_price(&rpc), Some(42_000));
}

#[tokio::test]
async fn test_strict_fee_mode_sends_nothing() {
    let mut config = Config::from_toml_str(CONFIG).unwrap();
    config.fees.strict = true;
    let rpc = Arc::new(MockChainRpc::new());
    let wallet = MockWallet::new();
    let flow = purchase_flow(&config, rpc.clone(), Arc::new(MockFeeOracle::failing()));

    let err = flow
        .purchase(&open_presale(), &wallet, 1_000, 10_000, NOW)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LaunchpadError::Transaction(TransactionBuilderError::Estimation(_))
    ));
    assert_eq!(wallet.sign_calls(), 0);
    assert!(rpc.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_oracle_estimate_is_requested_at_configured_level() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let rpc = Arc::new(MockChainRpc::new());
    let oracle = Arc::new(MockFeeOracle::returning(1_234.2));
    let flow = purchase_flow(&config, rpc.clone(), oracle.clone());

    flow.purchase(&open_presale(), &MockWallet::new(), 1_000, 10_000, NOW)
        .await
        .unwrap();

    assert_eq!(oracle.last_level(), Some(config.fees.priority_level));
    assert_eq!(sent_unit_price(&rpc), Some(1_235));
}

#[tokio::test]
async fn test_program_error_is_decoded() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let rpc = Arc::new(MockChainRpc::new());
    rpc.set_confirmation(MockConfirmation::Failed(
        "Error processing Instruction 2: custom program error: 0x1771".to_string(),
    ));
    let flow = purchase_flow(&config, rpc.clone(), Arc::new(MockFeeOracle::returning(100.0)));

    let err = flow
        .purchase(&open_presale(), &MockWallet::new(), 1_000, 10_000, NOW)
        .await
        .unwrap_err();

    match err {
        LaunchpadError::Transaction(TransactionBuilderError::Program { code, .. }) => {
            assert_eq!(code, 6001)
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_blockhash_is_ambiguous() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let rpc = Arc::new(MockChainRpc::new());
    rpc.set_confirmation(MockConfirmation::Never);
    rpc.set_last_valid_block_height(100);
    rpc.set_block_height(101);
    let wallet = MockWallet::new();
    let flow = purchase_flow(&config, rpc.clone(), Arc::new(MockFeeOracle::returning(100.0)));

    let err = flow
        .purchase(&open_presale(), &wallet, 1_000, 10_000, NOW)
        .await
        .unwrap_err();

    let sent = rpc.sent_transactions();
    assert_eq!(sent.len(), 1);
    match &err {
        LaunchpadError::Transaction(TransactionBuilderError::ConfirmationTimeout { signature }) => {
            assert_eq!(*signature, sent[0].signatures[0]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(sent[0].message.static_account_keys()[0], wallet.pubkey());
}
