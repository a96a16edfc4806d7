//! Claiming vested reward tokens
//!
//! Claiming is two-step: `check_eligibility` refreshes the receipt's
//! claimable amount on-chain and must have run at least once before `claim`.

use solana_sdk::instruction::Instruction;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use tracing::info;

use crate::error::{LaunchpadError, Result};
use crate::flows::{require_signer, require_status, FlowContext};
use crate::observability::TraceContext;
use crate::program::launchpad::{ClaimAccounts, LaunchpadInstruction, ReceiptAccounts};
use crate::status::vested_amount;
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::ConfirmedTransaction;
use crate::types::{ProjectRecord, PurchaseReceipt};
use crate::wallet::WalletSigner;

pub struct ClaimFlow {
    ctx: FlowContext,
}

impl ClaimFlow {
    pub fn new(ctx: FlowContext) -> Self {
        Self { ctx }
    }

    /// Vested but unclaimed tokens at `now`, computed locally
    pub fn preview_claimable(record: &ProjectRecord, receipt: &PurchaseReceipt, now: i64) -> u64 {
        vested_amount(
            receipt.token_allocation,
            record.vesting_started_at,
            record.vesting_period,
            now,
        )
        .saturating_sub(receipt.tokens_claimed)
    }

    /// Whether the UI may offer "claim" for this receipt
    pub fn can_claim(receipt: &PurchaseReceipt) -> bool {
        receipt.eligibility_checked_at.is_some() && !receipt.refunded
    }

    fn check_receipt(record: &ProjectRecord, receipt: &PurchaseReceipt) -> Result<()> {
        if receipt.project != record.id {
            return Err(LaunchpadError::validation(format!(
                "Receipt belongs to project {}, not {}",
                receipt.project, record.id
            )));
        }
        Ok(())
    }

    pub fn build_check_eligibility(
        &self,
        record: &ProjectRecord,
        receipt: &PurchaseReceipt,
        now: i64,
    ) -> Result<Vec<Instruction>> {
        Self::check_receipt(record, receipt)?;
        require_status("check eligibility", record, now, |s| s.is_vesting())?;

        let program_id = self.ctx.programs.launchpad;
        let accounts = ReceiptAccounts::derive(&program_id, &record.id, &receipt.buyer);
        Ok(vec![LaunchpadInstruction::CheckClaimEligibility { accounts }
            .into_instruction(&program_id)?])
    }

    pub fn build_claim(
        &self,
        record: &ProjectRecord,
        receipt: &PurchaseReceipt,
        now: i64,
    ) -> Result<Vec<Instruction>> {
        Self::check_receipt(record, receipt)?;
        if receipt.eligibility_checked_at.is_none() {
            return Err(LaunchpadError::validation(
                "Claim eligibility has not been checked for this purchase",
            ));
        }
        require_status("claim", record, now, |s| s.is_vesting())?;
        if Self::preview_claimable(record, receipt, now) == 0 {
            return Err(LaunchpadError::validation("Nothing is claimable yet"));
        }

        let program_id = self.ctx.programs.launchpad;
        let accounts = ClaimAccounts::derive(&program_id, &record.id, &receipt.buyer, &record.token_mint);
        Ok(vec![
            create_associated_token_account_idempotent(
                &receipt.buyer,
                &receipt.buyer,
                &record.token_mint,
                &spl_token::id(),
            ),
            LaunchpadInstruction::Claim { accounts }.into_instruction(&program_id)?,
        ])
    }

    pub async fn check_eligibility(
        &self,
        record: &ProjectRecord,
        receipt: &PurchaseReceipt,
        wallet: &dyn WalletSigner,
        now: i64,
    ) -> Result<ConfirmedTransaction> {
        require_signer(&receipt.buyer, &wallet.pubkey(), "Eligibility check")?;
        let trace_ctx = TraceContext::for_project("check_eligibility", &record.id.to_string());
        StructuredLogger::new(&trace_ctx).log_flow_started(&receipt.buyer.to_string());

        let draft = self.build_check_eligibility(record, receipt, now)?;
        Ok(self.ctx.builder.build_and_send(draft, wallet, &trace_ctx).await?)
    }

    pub async fn claim(
        &self,
        record: &ProjectRecord,
        receipt: &PurchaseReceipt,
        wallet: &dyn WalletSigner,
        now: i64,
    ) -> Result<ConfirmedTransaction> {
        require_signer(&receipt.buyer, &wallet.pubkey(), "Claim")?;
        let trace_ctx = TraceContext::for_project("claim", &record.id.to_string());
        StructuredLogger::new(&trace_ctx).log_flow_started(&receipt.buyer.to_string());

        let draft = self.build_claim(record, receipt, now)?;
        let confirmed = self.ctx.builder.build_and_send(draft, wallet, &trace_ctx).await?;

        info!(
            project = %record.id,
            buyer = %receipt.buyer,
            preview = Self::preview_claimable(record, receipt, now),
            signature = %confirmed.signature,
            "Claim confirmed"
        );
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn receipt(checked: bool) -> PurchaseReceipt {
        PurchaseReceipt {
            project: Pubkey::new_unique(),
            buyer: Pubkey::new_unique(),
            amount_contributed: 1_000,
            token_allocation: 1_000,
            tokens_claimed: 250,
            claimable_amount: 0,
            eligibility_checked_at: checked.then_some(100),
            refunded: false,
        }
    }

    #[test]
    fn test_can_claim_requires_eligibility_check() {
        assert!(!ClaimFlow::can_claim(&receipt(false)));
        assert!(ClaimFlow::can_claim(&receipt(true)));
    }
}
