//! Contributing quote currency to a presale

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use tracing::info;

use crate::error::{LaunchpadError, Result};
use crate::flows::{require_status, FlowContext};
use crate::observability::TraceContext;
use crate::program::launchpad::{LaunchpadInstruction, PurchaseAccounts};
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{ConfirmedTransaction, TransactionBuilderError};
use crate::types::ProjectRecord;
use crate::wallet::WalletSigner;

/// Platform fee charged on top of the purchase amount, in percent
///
/// The program debits amount and fee from the buyer's quote account, so a
/// wrapped-SOL account is funded with both.
pub const PLATFORM_FEE_PERCENT: u128 = 1;

/// `balance >= amount * 1.01`, in integer arithmetic
pub fn covers_purchase(balance: u64, amount: u64) -> bool {
    balance as u128 * 100 >= amount as u128 * (100 + PLATFORM_FEE_PERCENT)
}

/// Amount plus the platform fee rounded up; the least balance `covers_purchase` accepts
pub fn purchase_funding(amount: u64) -> u64 {
    let amount = amount as u128;
    let fee = (amount * PLATFORM_FEE_PERCENT).div_ceil(100);
    u64::try_from(amount + fee).unwrap_or(u64::MAX)
}

pub struct PurchaseFlow {
    ctx: FlowContext,
}

impl PurchaseFlow {
    pub fn new(ctx: FlowContext) -> Self {
        Self { ctx }
    }

    /// What the buyer can spend in the project's quote currency
    ///
    /// Native lamports when the quote is wrapped SOL, otherwise the balance of
    /// the buyer's associated token account.
    pub async fn spendable_balance(&self, record: &ProjectRecord, buyer: &Pubkey) -> Result<u64> {
        let rpc = self.ctx.rpc();
        let balance = if record.quote_mint == spl_token::native_mint::id() {
            rpc.balance(buyer).await?
        } else {
            rpc.token_balance(&get_associated_token_address(buyer, &record.quote_mint))
                .await?
        };
        Ok(balance)
    }

    /// Validate and build the purchase draft; makes no network calls
    pub fn build_instructions(
        &self,
        record: &ProjectRecord,
        buyer: &Pubkey,
        amount: u64,
        balance: u64,
        now: i64,
    ) -> Result<Vec<Instruction>> {
        if amount == 0 {
            return Err(LaunchpadError::validation("Purchase amount must be greater than zero"));
        }
        require_status("purchase", record, now, |s| s.accepts_purchases())?;
        if !covers_purchase(balance, amount) {
            return Err(LaunchpadError::validation(format!(
                "Insufficient balance: {balance} available, {amount} plus {PLATFORM_FEE_PERCENT}% platform fee required"
            )));
        }

        let program_id = self.ctx.programs.launchpad;
        let accounts = PurchaseAccounts::derive(&program_id, &record.id, buyer, &record.quote_mint);
        let mut draft = Vec::with_capacity(4);

        if record.quote_mint == spl_token::native_mint::id() {
            draft.push(create_associated_token_account_idempotent(
                buyer,
                buyer,
                &record.quote_mint,
                &spl_token::id(),
            ));
            draft.push(system_instruction::transfer(
                buyer,
                &accounts.buyer_quote_account,
                purchase_funding(amount),
            ));
            draft.push(
                spl_token::instruction::sync_native(&spl_token::id(), &accounts.buyer_quote_account)
                    .map_err(|e| TransactionBuilderError::instruction_failed("spl-token", e.to_string()))?,
            );
        }

        draft.push(LaunchpadInstruction::purchase(accounts, amount)?.into_instruction(&program_id)?);
        Ok(draft)
    }

    /// `buyer_balance` is the caller's view of the buyer's spendable balance
    pub async fn purchase(
        &self,
        record: &ProjectRecord,
        wallet: &dyn WalletSigner,
        amount: u64,
        buyer_balance: u64,
        now: i64,
    ) -> Result<ConfirmedTransaction> {
        let buyer = wallet.pubkey();
        let trace_ctx = TraceContext::for_project("purchase", &record.id.to_string());
        StructuredLogger::new(&trace_ctx).log_flow_started(&buyer.to_string());

        let draft = self.build_instructions(record, &buyer, amount, buyer_balance, now)?;
        let confirmed = self.ctx.builder.build_and_send(draft, wallet, &trace_ctx).await?;

        info!(project = %record.id, %buyer, amount, signature = %confirmed.signature, "Purchase confirmed");
        Ok(confirmed)
    }
}
