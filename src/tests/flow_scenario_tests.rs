//! Purchase, claim and withdraw scenarios against the in-memory chain

use solana_sdk::pubkey::Pubkey;

use super::test_helpers::*;
use crate::error::LaunchpadError;
use crate::flows::{ClaimFlow, PurchaseFlow, WithdrawFlow};
use crate::program::launchpad::discriminator;
use crate::test_utils::{sent_instructions_for, MockWallet};
use crate::tx_builder::TransactionBuilderError;
use crate::wallet::WalletSigner;

#[tokio::test]
async fn test_purchase_balance_guard_makes_no_network_call() {
    let h = Harness::new();
    let wallet = MockWallet::new();
    let record = presale_project(Pubkey::new_unique(), spl_token::native_mint::id());
    let flow = PurchaseFlow::new(h.ctx.clone());

    // 1% platform fee is reserved on top of the amount
    let err = flow
        .purchase(&record, &wallet, 1_000_000_000, 1_009_999_999, DEADLINE - 10)
        .await
        .unwrap_err();

    assert!(matches!(err, LaunchpadError::Validation(_)), "got {err:?}");
    assert_eq!(h.rpc.total_calls(), 0);
    assert_eq!(h.oracle.calls(), 0);
    assert_eq!(wallet.sign_calls(), 0);
}

#[tokio::test]
async fn test_purchase_with_wrapped_sol_wraps_before_purchase() {
    let h = Harness::new();
    let wallet = MockWallet::new();
    let record = presale_project(Pubkey::new_unique(), spl_token::native_mint::id());
    let flow = PurchaseFlow::new(h.ctx.clone());

    let draft = flow
        .build_instructions(&record, &wallet.pubkey(), 500, 1_000, DEADLINE - 10)
        .unwrap();
    let programs: Vec<Pubkey> = draft.iter().map(|ix| ix.program_id).collect();
    // SystemInstruction::Transfer: u32 tag then u64 lamports, amount plus 1% fee
    assert_eq!(&draft[1].data[4..12], &505u64.to_le_bytes());
    assert_eq!(
        programs,
        vec![
            spl_associated_token_account::id(),
            solana_sdk::system_program::id(),
            spl_token::id(),
            h.ctx.programs.launchpad,
        ]
    );

    let confirmed = flow
        .purchase(&record, &wallet, 500, 1_000, DEADLINE - 10)
        .await
        .unwrap();
    assert_ne!(confirmed.signature, Default::default());

    let sent = sent_instructions_for(&h.rpc, &h.ctx.programs.launchpad);
    assert_eq!(sent.len(), 1);
    assert_eq!(&sent[0].data[..8], &discriminator("purchase"));
    assert_eq!(&sent[0].data[8..], &500u64.to_le_bytes());
}

#[tokio::test]
async fn test_purchase_with_spl_quote_skips_wrapping() {
    let h = Harness::new();
    let buyer = Pubkey::new_unique();
    let record = presale_project(Pubkey::new_unique(), Pubkey::new_unique());
    let flow = PurchaseFlow::new(h.ctx.clone());

    let ata = spl_associated_token_account::get_associated_token_address(&buyer, &record.quote_mint);
    h.rpc.set_token_balance(ata, 7_777);
    assert_eq!(flow.spendable_balance(&record, &buyer).await.unwrap(), 7_777);

    let draft = flow
        .build_instructions(&record, &buyer, 100, 7_777, DEADLINE - 10)
        .unwrap();
    assert_eq!(draft.len(), 1);
    assert_eq!(draft[0].program_id, h.ctx.programs.launchpad);
}

#[tokio::test]
async fn test_purchase_rejected_after_deadline() {
    let h = Harness::new();
    let record = presale_project(Pubkey::new_unique(), spl_token::native_mint::id());
    let flow = PurchaseFlow::new(h.ctx.clone());

    let err = flow
        .build_instructions(&record, &Pubkey::new_unique(), 100, 1_000, DEADLINE + 1)
        .unwrap_err();
    match err {
        LaunchpadError::InvalidStatus { operation, status } => {
            assert_eq!(operation, "purchase");
            assert_eq!(status, "Expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_claim_before_eligibility_check_is_rejected_locally() {
    let h = Harness::new();
    let wallet = MockWallet::new();
    let (record, now) = vesting_project(Pubkey::new_unique(), 1_000);
    let receipt = receipt_for(&record, wallet.pubkey());
    let flow = ClaimFlow::new(h.ctx.clone());

    assert!(!ClaimFlow::can_claim(&receipt));
    let err = flow.claim(&record, &receipt, &wallet, now).await.unwrap_err();

    assert!(matches!(err, LaunchpadError::Validation(_)), "got {err:?}");
    assert_eq!(h.rpc.total_calls(), 0);
}

#[tokio::test]
async fn test_eligibility_check_then_claim() {
    let h = Harness::new();
    let wallet = MockWallet::new();
    let (record, _) = vesting_project(Pubkey::new_unique(), 0);
    let halfway = record.vesting_started_at.unwrap() + record.vesting_period / 2;
    let mut receipt = receipt_for(&record, wallet.pubkey());
    let flow = ClaimFlow::new(h.ctx.clone());

    flow.check_eligibility(&record, &receipt, &wallet, halfway)
        .await
        .unwrap();
    receipt.eligibility_checked_at = Some(halfway);

    assert_eq!(
        ClaimFlow::preview_claimable(&record, &receipt, halfway),
        receipt.token_allocation / 2
    );
    flow.claim(&record, &receipt, &wallet, halfway).await.unwrap();

    let sent = sent_instructions_for(&h.rpc, &h.ctx.programs.launchpad);
    assert_eq!(sent.len(), 2);
    assert_eq!(&sent[0].data[..], &discriminator("check_claim_eligibility"));
    assert_eq!(&sent[1].data[..], &discriminator("claim"));
}

#[tokio::test]
async fn test_claim_by_another_wallet_is_unauthorized() {
    let h = Harness::new();
    let (record, now) = vesting_project(Pubkey::new_unique(), 1_000);
    let mut receipt = receipt_for(&record, Pubkey::new_unique());
    receipt.eligibility_checked_at = Some(now);

    let err = ClaimFlow::new(h.ctx.clone())
        .claim(&record, &receipt, &MockWallet::new(), now)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Unauthorized(_)), "got {err:?}");
    assert_eq!(h.rpc.total_calls(), 0);
}

#[tokio::test]
async fn test_refund_when_target_missed_unwraps_sol() {
    let h = Harness::new();
    let wallet = MockWallet::new();
    let record = presale_project(Pubkey::new_unique(), spl_token::native_mint::id());
    let receipt = receipt_for(&record, wallet.pubkey());
    let flow = WithdrawFlow::new(h.ctx.clone());

    flow.refund(&record, &receipt, &wallet, DEADLINE + 1).await.unwrap();

    let launchpad = sent_instructions_for(&h.rpc, &h.ctx.programs.launchpad);
    assert_eq!(launchpad.len(), 1);
    assert_eq!(&launchpad[0].data[..], &discriminator("withdraw_funds"));

    // CloseAccount is spl-token instruction 9
    let token_ixs = sent_instructions_for(&h.rpc, &spl_token::id());
    assert_eq!(token_ixs.last().map(|ix| ix.data[0]), Some(9));
}

#[tokio::test]
async fn test_refund_rejected_when_launch_window_lapsed() {
    let h = Harness::new();
    let wallet = MockWallet::new();
    let record = ready_project(Pubkey::new_unique());
    let receipt = receipt_for(&record, wallet.pubkey());

    let err = WithdrawFlow::new(h.ctx.clone())
        .refund(&record, &receipt, &wallet, lapsed_time())
        .await
        .unwrap_err();

    assert!(matches!(err, LaunchpadError::Validation(_)), "got {err:?}");
    assert!(h.rpc.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_refund_rejected_while_presale_runs() {
    let h = Harness::new();
    let wallet = MockWallet::new();
    let record = presale_project(Pubkey::new_unique(), spl_token::native_mint::id());
    let receipt = receipt_for(&record, wallet.pubkey());

    let err = WithdrawFlow::new(h.ctx.clone())
        .build_refund(&record, &receipt, DEADLINE - 1)
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::InvalidStatus { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_refund_twice_is_rejected() {
    let h = Harness::new();
    let record = presale_project(Pubkey::new_unique(), spl_token::native_mint::id());
    let mut receipt = receipt_for(&record, Pubkey::new_unique());
    receipt.refunded = true;

    let err = WithdrawFlow::new(h.ctx.clone())
        .build_refund(&record, &receipt, DEADLINE + 1)
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Validation(_)));
}

#[tokio::test]
async fn test_lp_withdrawal_requires_authority() {
    let h = Harness::new();
    let authority = MockWallet::new();
    let (record, now) = vesting_project(authority.pubkey(), 10);
    let flow = WithdrawFlow::new(h.ctx.clone());

    let err = flow
        .withdraw_lp_tokens(&record, &MockWallet::new(), now)
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchpadError::Unauthorized(_)), "got {err:?}");
    assert_eq!(h.rpc.total_calls(), 0);

    flow.withdraw_lp_tokens(&record, &authority, now).await.unwrap();
    let sent = sent_instructions_for(&h.rpc, &h.ctx.programs.launchpad);
    assert_eq!(&sent[0].data[..], &discriminator("withdraw_lp_tokens"));
}

#[tokio::test]
async fn test_wallet_decline_surfaces_as_signing_rejected() {
    let h = Harness::new();
    let wallet = MockWallet::rejecting();
    let record = presale_project(Pubkey::new_unique(), Pubkey::new_unique());

    let err = PurchaseFlow::new(h.ctx.clone())
        .purchase(&record, &wallet, 100, 1_000, DEADLINE - 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LaunchpadError::Transaction(TransactionBuilderError::SigningRejected(_))
    ));
    assert_eq!(err.category(), "signing_rejected");
    assert!(h.rpc.sent_transactions().is_empty());
}
