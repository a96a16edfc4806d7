//! Instructions of the launchpad presale program
//!
//! Each instruction kind is a variant carrying a typed account struct and its
//! borsh-encoded arguments. Data is the Anchor layout:
//! `sha256("global:<name>")[..8] ++ borsh(args)`.

use borsh::BorshSerialize;
use solana_sdk::{
    hash::hashv,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::program::{amm::AmmAccounts, pda};
use crate::tx_builder::TransactionBuilderError;

/// Ordered account list of one instruction
pub trait ToAccountMetas {
    fn to_account_metas(&self) -> Vec<AccountMeta>;
}

/// 8-byte Anchor instruction discriminator
pub fn discriminator(name: &str) -> [u8; 8] {
    let hash = hashv(&[format!("global:{name}").as_bytes()]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.to_bytes()[..8]);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct PurchaseArgs {
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct LaunchPoolArgs {
    pub amm_nonce: u8,
    pub open_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseAccounts {
    pub buyer: Pubkey,
    pub project: Pubkey,
    pub receipt: Pubkey,
    pub buyer_quote_account: Pubkey,
    pub quote_vault: Pubkey,
    pub quote_mint: Pubkey,
    pub project_authority: Pubkey,
}

impl PurchaseAccounts {
    pub fn derive(
        program_id: &Pubkey,
        project: &Pubkey,
        buyer: &Pubkey,
        quote_mint: &Pubkey,
    ) -> Self {
        Self {
            buyer: *buyer,
            project: *project,
            receipt: pda::purchase_receipt(program_id, project, buyer).0,
            buyer_quote_account: spl_associated_token_account::get_associated_token_address(
                buyer, quote_mint,
            ),
            quote_vault: pda::quote_vault(program_id, project).0,
            quote_mint: *quote_mint,
            project_authority: pda::project_authority(program_id, project).0,
        }
    }
}

impl ToAccountMetas for PurchaseAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.buyer, true),
            AccountMeta::new(self.project, false),
            AccountMeta::new(self.receipt, false),
            AccountMeta::new(self.buyer_quote_account, false),
            AccountMeta::new(self.quote_vault, false),
            AccountMeta::new_readonly(self.quote_mint, false),
            AccountMeta::new_readonly(self.project_authority, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Accounts of the eligibility refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptAccounts {
    pub buyer: Pubkey,
    pub project: Pubkey,
    pub receipt: Pubkey,
}

impl ReceiptAccounts {
    pub fn derive(program_id: &Pubkey, project: &Pubkey, buyer: &Pubkey) -> Self {
        Self {
            buyer: *buyer,
            project: *project,
            receipt: pda::purchase_receipt(program_id, project, buyer).0,
        }
    }
}

impl ToAccountMetas for ReceiptAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.buyer, true),
            AccountMeta::new_readonly(self.project, false),
            AccountMeta::new(self.receipt, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimAccounts {
    pub buyer: Pubkey,
    pub project: Pubkey,
    pub receipt: Pubkey,
    pub project_authority: Pubkey,
    pub token_vault: Pubkey,
    pub buyer_token_account: Pubkey,
    pub token_mint: Pubkey,
}

impl ClaimAccounts {
    pub fn derive(
        program_id: &Pubkey,
        project: &Pubkey,
        buyer: &Pubkey,
        token_mint: &Pubkey,
    ) -> Self {
        Self {
            buyer: *buyer,
            project: *project,
            receipt: pda::purchase_receipt(program_id, project, buyer).0,
            project_authority: pda::project_authority(program_id, project).0,
            token_vault: pda::token_vault(program_id, project).0,
            buyer_token_account: spl_associated_token_account::get_associated_token_address(
                buyer, token_mint,
            ),
            token_mint: *token_mint,
        }
    }
}

impl ToAccountMetas for ClaimAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.buyer, true),
            AccountMeta::new(self.project, false),
            AccountMeta::new(self.receipt, false),
            AccountMeta::new_readonly(self.project_authority, false),
            AccountMeta::new(self.token_vault, false),
            AccountMeta::new(self.buyer_token_account, false),
            AccountMeta::new_readonly(self.token_mint, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Accounts of a refund from an expired presale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawFundsAccounts {
    pub buyer: Pubkey,
    pub project: Pubkey,
    pub receipt: Pubkey,
    pub project_authority: Pubkey,
    pub quote_vault: Pubkey,
    pub buyer_quote_account: Pubkey,
    pub quote_mint: Pubkey,
}

impl WithdrawFundsAccounts {
    pub fn derive(
        program_id: &Pubkey,
        project: &Pubkey,
        buyer: &Pubkey,
        quote_mint: &Pubkey,
    ) -> Self {
        Self {
            buyer: *buyer,
            project: *project,
            receipt: pda::purchase_receipt(program_id, project, buyer).0,
            project_authority: pda::project_authority(program_id, project).0,
            quote_vault: pda::quote_vault(program_id, project).0,
            buyer_quote_account: spl_associated_token_account::get_associated_token_address(
                buyer, quote_mint,
            ),
            quote_mint: *quote_mint,
        }
    }
}

impl ToAccountMetas for WithdrawFundsAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.buyer, true),
            AccountMeta::new(self.project, false),
            AccountMeta::new(self.receipt, false),
            AccountMeta::new_readonly(self.project_authority, false),
            AccountMeta::new(self.quote_vault, false),
            AccountMeta::new(self.buyer_quote_account, false),
            AccountMeta::new_readonly(self.quote_mint, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawLpTokensAccounts {
    pub authority: Pubkey,
    pub project: Pubkey,
    pub project_authority: Pubkey,
    pub lp_mint: Pubkey,
    pub lp_vault: Pubkey,
    pub authority_lp_account: Pubkey,
}

impl WithdrawLpTokensAccounts {
    pub fn derive(
        program_id: &Pubkey,
        project: &Pubkey,
        authority: &Pubkey,
        lp_mint: &Pubkey,
    ) -> Self {
        Self {
            authority: *authority,
            project: *project,
            project_authority: pda::project_authority(program_id, project).0,
            lp_mint: *lp_mint,
            lp_vault: pda::lp_vault(program_id, project).0,
            authority_lp_account: spl_associated_token_account::get_associated_token_address(
                authority, lp_mint,
            ),
        }
    }
}

impl ToAccountMetas for WithdrawLpTokensAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.authority, true),
            AccountMeta::new(self.project, false),
            AccountMeta::new_readonly(self.project_authority, false),
            AccountMeta::new_readonly(self.lp_mint, false),
            AccountMeta::new(self.lp_vault, false),
            AccountMeta::new(self.authority_lp_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Accounts of the pool launch; the program CPIs into the AMM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPoolAccounts {
    pub authority: Pubkey,
    pub project: Pubkey,
    pub project_authority: Pubkey,
    pub token_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub token_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub lp_vault: Pubkey,
    pub market: Pubkey,
    pub openbook_program: Pubkey,
    pub amm_program: Pubkey,
    pub amm: AmmAccounts,
}

impl ToAccountMetas for LaunchPoolAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.authority, true),
            AccountMeta::new(self.project, false),
            AccountMeta::new_readonly(self.project_authority, false),
            AccountMeta::new_readonly(self.token_mint, false),
            AccountMeta::new_readonly(self.quote_mint, false),
            AccountMeta::new(self.token_vault, false),
            AccountMeta::new(self.quote_vault, false),
            AccountMeta::new(self.lp_vault, false),
            AccountMeta::new_readonly(self.market, false),
            AccountMeta::new_readonly(self.openbook_program, false),
            AccountMeta::new_readonly(self.amm_program, false),
            AccountMeta::new(self.amm.amm_id, false),
            AccountMeta::new_readonly(self.amm.authority, false),
            AccountMeta::new(self.amm.open_orders, false),
            AccountMeta::new(self.amm.lp_mint, false),
            AccountMeta::new(self.amm.coin_vault, false),
            AccountMeta::new(self.amm.pc_vault, false),
            AccountMeta::new(self.amm.target_orders, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ]
    }
}

/// Tagged launchpad instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchpadInstruction {
    Purchase {
        accounts: PurchaseAccounts,
        args: PurchaseArgs,
    },
    CheckClaimEligibility {
        accounts: ReceiptAccounts,
    },
    Claim {
        accounts: ClaimAccounts,
    },
    WithdrawFunds {
        accounts: WithdrawFundsAccounts,
    },
    WithdrawLpTokens {
        accounts: WithdrawLpTokensAccounts,
    },
    LaunchPool {
        accounts: LaunchPoolAccounts,
        args: LaunchPoolArgs,
    },
}

impl LaunchpadInstruction {
    /// # Errors
    ///
    /// Rejects a zero amount.
    pub fn purchase(accounts: PurchaseAccounts, amount: u64) -> Result<Self, TransactionBuilderError> {
        if amount == 0 {
            return Err(TransactionBuilderError::validation(
                "Purchase amount must be greater than zero",
            ));
        }
        Ok(Self::Purchase {
            accounts,
            args: PurchaseArgs { amount },
        })
    }

    /// # Errors
    ///
    /// Rejects a market that is the default key or equal to the project.
    pub fn launch_pool(
        accounts: LaunchPoolAccounts,
        open_time: u64,
    ) -> Result<Self, TransactionBuilderError> {
        if accounts.market == Pubkey::default() || accounts.market == accounts.project {
            return Err(TransactionBuilderError::instruction_failed(
                "launchpad",
                "launch_pool requires a real market account",
            ));
        }
        let args = LaunchPoolArgs {
            amm_nonce: accounts.amm.authority_nonce,
            open_time,
        };
        Ok(Self::LaunchPool { accounts, args })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Purchase { .. } => "purchase",
            Self::CheckClaimEligibility { .. } => "check_claim_eligibility",
            Self::Claim { .. } => "claim",
            Self::WithdrawFunds { .. } => "withdraw_funds",
            Self::WithdrawLpTokens { .. } => "withdraw_lp_tokens",
            Self::LaunchPool { .. } => "launch_pool",
        }
    }

    pub fn into_instruction(self, program_id: &Pubkey) -> Result<Instruction, TransactionBuilderError> {
        let mut data = discriminator(self.name()).to_vec();
        let encode_err =
            |e: std::io::Error| TransactionBuilderError::instruction_failed("launchpad", e.to_string());

        let accounts = match &self {
            Self::Purchase { accounts, args } => {
                args.serialize(&mut data).map_err(encode_err)?;
                accounts.to_account_metas()
            }
            Self::CheckClaimEligibility { accounts } => accounts.to_account_metas(),
            Self::Claim { accounts } => accounts.to_account_metas(),
            Self::WithdrawFunds { accounts } => accounts.to_account_metas(),
            Self::WithdrawLpTokens { accounts } => accounts.to_account_metas(),
            Self::LaunchPool { accounts, args } => {
                args.serialize(&mut data).map_err(encode_err)?;
                accounts.to_account_metas()
            }
        };

        Ok(Instruction {
            program_id: *program_id,
            accounts,
            data,
        })
    }
}
