//! Market launch saga: full runs, resumes and refusals

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

use super::test_helpers::*;
use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use crate::error::LaunchpadError;
use crate::flows::launch::{CREATE_MARKET_STEP, LAUNCH_POOL_STEP};
use crate::flows::LaunchPhase;
use crate::program::launchpad::discriminator;
use crate::program::market::{find_vault_signer, market_seed, MarketAccounts};
use crate::program::AmmAccounts;
use crate::test_utils::{amm_pool_data, sent_instructions_for, MockWallet};
use crate::tx_builder::TransactionBuilderError;
use crate::types::CheckpointRecord;
use crate::wallet::WalletSigner;

fn authority_wallet() -> (Arc<MockWallet>, Arc<dyn WalletSigner>) {
    let wallet = Arc::new(MockWallet::new());
    let signer: Arc<dyn WalletSigner> = wallet.clone();
    (wallet, signer)
}

fn expected_checkpoint(h: &Harness, authority: &Pubkey, project: &Pubkey) -> CheckpointRecord {
    let openbook = h.ctx.programs.openbook;
    let seed = market_seed(project);
    let accounts = MarketAccounts::derive(authority, &seed, &openbook).unwrap();
    let (_, nonce) = find_vault_signer(&accounts.market, &openbook).unwrap();
    CheckpointRecord {
        market_id: accounts.market,
        market_seed: seed,
        base_vault: accounts.base_vault,
        quote_vault: accounts.quote_vault,
        request_queue: accounts.request_queue,
        event_queue: accounts.event_queue,
        bids: accounts.bids,
        asks: accounts.asks,
        vault_signer_nonce: nonce,
    }
}

#[tokio::test]
async fn test_full_launch_sends_three_transactions() {
    let h = Harness::new();
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = h.orchestrator(store.clone());
    let (wallet, signer) = authority_wallet();
    let record = ready_project(wallet.pubkey());

    assert_eq!(orchestrator.phase(&record).await.unwrap(), LaunchPhase::NoCheckpoint);

    let outcome = orchestrator.launch(&record, signer, launch_time()).await.unwrap();

    assert_eq!(outcome.report.executed, vec![CREATE_MARKET_STEP, LAUNCH_POOL_STEP]);
    assert!(outcome.report.skipped.is_empty());
    assert_eq!(outcome.phase1_signatures.len(), 2);
    assert!(outcome.phase2_signature.is_some());
    assert_eq!(h.rpc.sent_transactions().len(), 3);
    assert_eq!(outcome.vesting_started_at, launch_time());

    // 50M whole tokens at 6 decimals against a 9-decimal quote
    let lots = outcome.lots.unwrap();
    assert_eq!(lots.base_lot_size, 10_000_000);
    assert_eq!(lots.quote_lot_size, 1_000);

    let checkpoint = expected_checkpoint(&h, &wallet.pubkey(), &record.id);
    assert_eq!(store.load(&record.id).await.unwrap(), Some(checkpoint.clone()));
    assert_eq!(outcome.market, checkpoint.market_id);

    let amm = AmmAccounts::derive(&h.ctx.programs.amm, &checkpoint.market_id);
    assert_eq!(outcome.amm_id, amm.amm_id);
    assert_eq!(outcome.lp_mint, amm.lp_mint);

    let openbook_ixs = sent_instructions_for(&h.rpc, &h.ctx.programs.openbook);
    assert_eq!(openbook_ixs.len(), 1);
    assert_eq!(openbook_ixs[0].data[0], 0);
    assert_eq!(openbook_ixs[0].data.len(), 39);

    let launchpad_ixs = sent_instructions_for(&h.rpc, &h.ctx.programs.launchpad);
    assert_eq!(&launchpad_ixs[0].data[..8], &discriminator("launch_pool"));
}

#[tokio::test]
async fn test_resume_after_pool_failure_skips_market_creation() {
    let h = Harness::new();
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = h.orchestrator(store.clone());
    let (wallet, signer) = authority_wallet();
    let record = ready_project(wallet.pubkey());

    h.rpc.fail_send_number(3, "connection reset by peer");
    let err = orchestrator
        .launch(&record, signer.clone(), launch_time())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LaunchpadError::Transaction(TransactionBuilderError::Submission(_))
    ));
    assert_eq!(h.rpc.sent_transactions().len(), 2);
    assert!(matches!(
        orchestrator.phase(&record).await.unwrap(),
        LaunchPhase::Checkpointed(_)
    ));

    let outcome = orchestrator.launch(&record, signer, launch_time() + 30).await.unwrap();

    assert_eq!(outcome.report.skipped, vec![CREATE_MARKET_STEP]);
    assert_eq!(outcome.report.executed, vec![LAUNCH_POOL_STEP]);
    assert!(outcome.phase1_signatures.is_empty());
    assert_eq!(h.rpc.sent_transactions().len(), 3);
}

#[tokio::test]
async fn test_tampered_checkpoint_is_reported_without_sending() {
    let h = Harness::new();
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = h.orchestrator(store.clone());
    let (wallet, signer) = authority_wallet();
    let record = ready_project(wallet.pubkey());

    let mut checkpoint = expected_checkpoint(&h, &wallet.pubkey(), &record.id);
    checkpoint.bids = Pubkey::new_unique();
    h.rpc.add_account(checkpoint.market_id);
    store.save(&record.id, &checkpoint).await.unwrap();

    let err = orchestrator.launch(&record, signer, launch_time()).await.unwrap_err();

    match err {
        LaunchpadError::CheckpointInconsistency { project, reason } => {
            assert_eq!(project, record.id);
            assert!(reason.contains("bids"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.rpc.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_checkpoint_for_missing_market_is_inconsistent() {
    let h = Harness::new();
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = h.orchestrator(store.clone());
    let (wallet, _) = authority_wallet();
    let record = ready_project(wallet.pubkey());
    let checkpoint = expected_checkpoint(&h, &wallet.pubkey(), &record.id);

    let err = orchestrator
        .verify_checkpoint(&record, &checkpoint)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::CheckpointInconsistency { .. }));

    h.rpc.add_account(checkpoint.market_id);
    orchestrator.verify_checkpoint(&record, &checkpoint).await.unwrap();
}

#[tokio::test]
async fn test_already_launched_makes_no_rpc_calls() {
    let h = Harness::new();
    let orchestrator = h.orchestrator(Arc::new(MemoryCheckpointStore::new()));
    let (wallet, signer) = authority_wallet();
    let mut record = ready_project(wallet.pubkey());
    record.lp_mint = Some(Pubkey::new_unique());

    let err = orchestrator.launch(&record, signer, launch_time()).await.unwrap_err();

    assert!(matches!(err, LaunchpadError::AlreadyLaunched { project } if project == record.id));
    assert_eq!(h.rpc.total_calls(), 0);
    assert_eq!(orchestrator.phase(&record).await.unwrap(), LaunchPhase::Done);
}

#[tokio::test]
async fn test_existing_market_accounts_are_not_recreated() {
    let h = Harness::new();
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = h.orchestrator(store.clone());
    let (wallet, signer) = authority_wallet();
    let record = ready_project(wallet.pubkey());

    // phase 1 landed but the process died before the checkpoint write
    let checkpoint = expected_checkpoint(&h, &wallet.pubkey(), &record.id);
    h.rpc.add_account(checkpoint.base_vault);
    h.rpc.add_account(checkpoint.market_id);

    let outcome = orchestrator.launch(&record, signer, launch_time()).await.unwrap();

    assert_eq!(outcome.report.executed, vec![CREATE_MARKET_STEP, LAUNCH_POOL_STEP]);
    assert!(outcome.phase1_signatures.is_empty());
    assert_eq!(h.rpc.sent_transactions().len(), 1);
    assert_eq!(store.load(&record.id).await.unwrap(), Some(checkpoint));
}

#[tokio::test]
async fn test_launch_by_non_authority_is_unauthorized() {
    let h = Harness::new();
    let orchestrator = h.orchestrator(Arc::new(MemoryCheckpointStore::new()));
    let (_, signer) = authority_wallet();
    let record = ready_project(Pubkey::new_unique());

    let err = orchestrator.launch(&record, signer, launch_time()).await.unwrap_err();

    assert!(matches!(err, LaunchpadError::Unauthorized(_)), "got {err:?}");
    assert_eq!(h.rpc.total_calls(), 0);
}

#[tokio::test]
async fn test_launch_before_target_is_rejected() {
    let h = Harness::new();
    let orchestrator = h.orchestrator(Arc::new(MemoryCheckpointStore::new()));
    let (wallet, signer) = authority_wallet();
    let record = presale_project(wallet.pubkey(), spl_token::native_mint::id());

    let err = orchestrator.launch(&record, signer, DEADLINE - 100).await.unwrap_err();
    assert!(matches!(err, LaunchpadError::InvalidStatus { operation: "launch", .. }));
}

#[tokio::test]
async fn test_relaunch_after_pool_keeps_original_vesting_start() {
    let h = Harness::new();
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = h.orchestrator(store.clone());
    let (wallet, signer) = authority_wallet();
    let record = ready_project(wallet.pubkey());

    let first = orchestrator
        .launch(&record, signer.clone(), launch_time())
        .await
        .unwrap();
    h.rpc
        .set_account_data(first.amm_id, amm_pool_data(launch_time() as u64));

    // The caller never stored lp_mint, so the record still looks unlaunched
    let second = orchestrator
        .launch(&record, signer, launch_time() + 5_000)
        .await
        .unwrap();

    assert_eq!(second.report.skipped, vec![CREATE_MARKET_STEP, LAUNCH_POOL_STEP]);
    assert!(second.report.executed.is_empty());
    assert!(second.phase2_signature.is_none());
    assert_eq!(second.vesting_started_at, launch_time());
    assert_eq!(second.lp_mint, first.lp_mint);
    assert_eq!(h.rpc.sent_transactions().len(), 3);
}

#[tokio::test]
async fn test_existing_pool_without_open_time_is_inconsistent() {
    let h = Harness::new();
    let store = Arc::new(MemoryCheckpointStore::new());
    let orchestrator = h.orchestrator(store.clone());
    let (wallet, signer) = authority_wallet();
    let record = ready_project(wallet.pubkey());

    let checkpoint = expected_checkpoint(&h, &wallet.pubkey(), &record.id);
    h.rpc.add_account(checkpoint.market_id);
    store.save(&record.id, &checkpoint).await.unwrap();
    let amm = AmmAccounts::derive(&h.ctx.programs.amm, &checkpoint.market_id);
    h.rpc.set_account_data(amm.amm_id, vec![0; 16]);

    let err = orchestrator
        .launch(&record, signer, launch_time() + 5_000)
        .await
        .unwrap_err();

    match err {
        LaunchpadError::CheckpointInconsistency { reason, .. } => {
            assert!(reason.contains("open time"), "reason: {reason}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.rpc.sent_transactions().is_empty());
}
