//! Liquidity-pool (AMM v4) address derivation
//!
//! Pool accounts are PDAs of the AMM program keyed by the order-book market
//! they trade against, so they are fully determined once the market exists.

use solana_sdk::pubkey::Pubkey;

const AMM_ASSOCIATED_SEED: &[u8] = b"amm_associated_seed";
const LP_MINT_ASSOCIATED_SEED: &[u8] = b"lp_mint_associated_seed";
const OPEN_ORDER_ASSOCIATED_SEED: &[u8] = b"open_order_associated_seed";
const TARGET_ASSOCIATED_SEED: &[u8] = b"target_associated_seed";
const COIN_VAULT_ASSOCIATED_SEED: &[u8] = b"coin_vault_associated_seed";
const PC_VAULT_ASSOCIATED_SEED: &[u8] = b"pc_vault_associated_seed";
const AMM_AUTHORITY_SEED: &[u8] = b"amm authority";

/// Byte offset of `pool_open_time` in the AMM v4 pool state: sixteen u64
/// parameters, eight u64 fee fields, then four u64 pnl fields precede it.
pub const POOL_OPEN_TIME_OFFSET: usize = (16 + 8 + 4) * 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmAccounts {
    pub amm_id: Pubkey,
    pub authority: Pubkey,
    pub authority_nonce: u8,
    pub open_orders: Pubkey,
    pub lp_mint: Pubkey,
    pub coin_vault: Pubkey,
    pub pc_vault: Pubkey,
    pub target_orders: Pubkey,
}

impl AmmAccounts {
    pub fn derive(amm_program: &Pubkey, market: &Pubkey) -> Self {
        let associated = |seed: &[u8]| {
            Pubkey::find_program_address(&[amm_program.as_ref(), market.as_ref(), seed], amm_program).0
        };
        let (authority, authority_nonce) =
            Pubkey::find_program_address(&[AMM_AUTHORITY_SEED], amm_program);

        Self {
            amm_id: associated(AMM_ASSOCIATED_SEED),
            authority,
            authority_nonce,
            open_orders: associated(OPEN_ORDER_ASSOCIATED_SEED),
            lp_mint: associated(LP_MINT_ASSOCIATED_SEED),
            coin_vault: associated(COIN_VAULT_ASSOCIATED_SEED),
            pc_vault: associated(PC_VAULT_ASSOCIATED_SEED),
            target_orders: associated(TARGET_ASSOCIATED_SEED),
        }
    }
}

/// `pool_open_time` of a pool account, or `None` if the data is too short
pub fn pool_open_time(data: &[u8]) -> Option<u64> {
    let bytes = data.get(POOL_OPEN_TIME_OFFSET..POOL_OPEN_TIME_OFFSET + 8)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}
