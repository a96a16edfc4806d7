//! Refunds from failed presales and LP-token withdrawal after launch

use solana_sdk::instruction::Instruction;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use tracing::info;

use crate::error::{LaunchpadError, Result};
use crate::flows::{require_signer, require_status, FlowContext};
use crate::observability::TraceContext;
use crate::program::launchpad::{LaunchpadInstruction, WithdrawFundsAccounts, WithdrawLpTokensAccounts};
use crate::status::{expiry_reason, ExpiryReason};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{ConfirmedTransaction, TransactionBuilderError};
use crate::types::{ProjectRecord, PurchaseReceipt, Status};
use crate::wallet::WalletSigner;

pub struct WithdrawFlow {
    ctx: FlowContext,
}

impl WithdrawFlow {
    pub fn new(ctx: FlowContext) -> Self {
        Self { ctx }
    }

    pub fn build_refund(
        &self,
        record: &ProjectRecord,
        receipt: &PurchaseReceipt,
        now: i64,
    ) -> Result<Vec<Instruction>> {
        if receipt.project != record.id {
            return Err(LaunchpadError::validation("Receipt does not belong to this project"));
        }
        require_status("refund", record, now, |s| s == Status::Expired)?;
        match expiry_reason(record, now) {
            Some(ExpiryReason::TargetMissed) => {}
            Some(ExpiryReason::LaunchWindowLapsed) => {
                return Err(LaunchpadError::validation(
                    "Presale met its target but was never launched; refunds need manual resolution",
                ))
            }
            None => return Err(LaunchpadError::invalid_status("refund", None)),
        }
        if receipt.refunded {
            return Err(LaunchpadError::validation("Contribution was already refunded"));
        }
        if receipt.amount_contributed == 0 {
            return Err(LaunchpadError::validation("Nothing was contributed"));
        }

        let program_id = self.ctx.programs.launchpad;
        let accounts =
            WithdrawFundsAccounts::derive(&program_id, &record.id, &receipt.buyer, &record.quote_mint);
        let buyer_quote_account = accounts.buyer_quote_account;

        let mut draft = vec![
            create_associated_token_account_idempotent(
                &receipt.buyer,
                &receipt.buyer,
                &record.quote_mint,
                &spl_token::id(),
            ),
            LaunchpadInstruction::WithdrawFunds { accounts }.into_instruction(&program_id)?,
        ];

        // Unwrap refunded SOL back to the buyer.
        if record.quote_mint == spl_token::native_mint::id() {
            draft.push(
                spl_token::instruction::close_account(
                    &spl_token::id(),
                    &buyer_quote_account,
                    &receipt.buyer,
                    &receipt.buyer,
                    &[],
                )
                .map_err(|e| TransactionBuilderError::instruction_failed("spl-token", e.to_string()))?,
            );
        }
        Ok(draft)
    }

    pub fn build_withdraw_lp(
        &self,
        record: &ProjectRecord,
        authority: &solana_sdk::pubkey::Pubkey,
        now: i64,
    ) -> Result<Vec<Instruction>> {
        require_status("LP withdrawal", record, now, |s| s.is_vesting())?;
        require_signer(&record.authority, authority, "LP withdrawal")?;
        let lp_mint = record
            .lp_mint
            .ok_or_else(|| LaunchpadError::validation("Project has no liquidity pool mint"))?;

        let program_id = self.ctx.programs.launchpad;
        let accounts = WithdrawLpTokensAccounts::derive(&program_id, &record.id, authority, &lp_mint);
        Ok(vec![
            create_associated_token_account_idempotent(authority, authority, &lp_mint, &spl_token::id()),
            LaunchpadInstruction::WithdrawLpTokens { accounts }.into_instruction(&program_id)?,
        ])
    }

    pub async fn refund(
        &self,
        record: &ProjectRecord,
        receipt: &PurchaseReceipt,
        wallet: &dyn WalletSigner,
        now: i64,
    ) -> Result<ConfirmedTransaction> {
        require_signer(&receipt.buyer, &wallet.pubkey(), "Refund")?;
        let trace_ctx = TraceContext::for_project("refund", &record.id.to_string());
        StructuredLogger::new(&trace_ctx).log_flow_started(&receipt.buyer.to_string());

        let draft = self.build_refund(record, receipt, now)?;
        let confirmed = self.ctx.builder.build_and_send(draft, wallet, &trace_ctx).await?;
        info!(
            project = %record.id,
            buyer = %receipt.buyer,
            amount = receipt.amount_contributed,
            signature = %confirmed.signature,
            "Refund confirmed"
        );
        Ok(confirmed)
    }

    pub async fn withdraw_lp_tokens(
        &self,
        record: &ProjectRecord,
        wallet: &dyn WalletSigner,
        now: i64,
    ) -> Result<ConfirmedTransaction> {
        let authority = wallet.pubkey();
        let trace_ctx = TraceContext::for_project("withdraw_lp", &record.id.to_string());
        StructuredLogger::new(&trace_ctx).log_flow_started(&authority.to_string());

        let draft = self.build_withdraw_lp(record, &authority, now)?;
        Ok(self.ctx.builder.build_and_send(draft, wallet, &trace_ctx).await?)
    }
}
