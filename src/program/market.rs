//! Order-book market accounts and sizing
//!
//! Every market account is created with `create_account_with_seed` from the
//! launching authority and a seed derived from the project id, so the same
//! project always maps to the same addresses.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction, sysvar,
};

use crate::tx_builder::TransactionBuilderError;

pub const MARKET_ACCOUNT_SIZE: usize = 388;
pub const REQUEST_QUEUE_SIZE: usize = 764;
pub const EVENT_QUEUE_SIZE: usize = 11_308;
pub const ORDERBOOK_SIZE: usize = 14_524;
pub const TOKEN_ACCOUNT_SIZE: usize = 165;

/// Hex characters of the project hash used as the seed base
pub const MARKET_SEED_LEN: usize = 10;

const MARKET_SUFFIX: &str = "m";
const REQUEST_QUEUE_SUFFIX: &str = "rq";
const EVENT_QUEUE_SUFFIX: &str = "eq";
const BIDS_SUFFIX: &str = "b";
const ASKS_SUFFIX: &str = "a";
const BASE_VAULT_SUFFIX: &str = "bv";
const QUOTE_VAULT_SUFFIX: &str = "qv";

/// Largest vault-signer nonce tried before giving up
const MAX_VAULT_SIGNER_NONCE: u64 = 255;

/// `hex(sha256(project id))[..10]`
pub fn market_seed(project: &Pubkey) -> String {
    let digest = Sha256::digest(project.to_string().as_bytes());
    let mut seed = hex::encode(digest);
    seed.truncate(MARKET_SEED_LEN);
    seed
}

/// Addresses of every account phase 1 creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketAccounts {
    pub seed: String,
    pub market: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
}

impl MarketAccounts {
    pub fn derive(base: &Pubkey, seed: &str, openbook: &Pubkey) -> Result<Self, TransactionBuilderError> {
        let with_seed = |suffix: &str, owner: &Pubkey| {
            Pubkey::create_with_seed(base, &format!("{seed}{suffix}"), owner)
                .map_err(|e| TransactionBuilderError::instruction_failed("openbook", e.to_string()))
        };
        let token_program = spl_token::id();

        Ok(Self {
            seed: seed.to_string(),
            market: with_seed(MARKET_SUFFIX, openbook)?,
            request_queue: with_seed(REQUEST_QUEUE_SUFFIX, openbook)?,
            event_queue: with_seed(EVENT_QUEUE_SUFFIX, openbook)?,
            bids: with_seed(BIDS_SUFFIX, openbook)?,
            asks: with_seed(ASKS_SUFFIX, openbook)?,
            base_vault: with_seed(BASE_VAULT_SUFFIX, &token_program)?,
            quote_vault: with_seed(QUOTE_VAULT_SUFFIX, &token_program)?,
        })
    }
}

/// Vault signer PDA for a given nonce, if that nonce is off-curve
pub fn vault_signer(market: &Pubkey, nonce: u64, openbook: &Pubkey) -> Option<Pubkey> {
    Pubkey::create_program_address(&[market.as_ref(), &nonce.to_le_bytes()], openbook).ok()
}

/// Lowest nonce yielding a valid vault signer
pub fn find_vault_signer(market: &Pubkey, openbook: &Pubkey) -> Option<(Pubkey, u64)> {
    (0..=MAX_VAULT_SIGNER_NONCE)
        .find_map(|nonce| vault_signer(market, nonce, openbook).map(|signer| (signer, nonce)))
}

/// Rent-exempt lamports for each account kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketRent {
    pub market: u64,
    pub request_queue: u64,
    pub event_queue: u64,
    pub orderbook: u64,
    pub token_account: u64,
}

/// Create the two token vaults and hand them to the vault signer
pub fn create_vault_instructions(
    payer: &Pubkey,
    accounts: &MarketAccounts,
    vault_signer: &Pubkey,
    base_mint: &Pubkey,
    quote_mint: &Pubkey,
    rent: &MarketRent,
) -> Result<Vec<Instruction>, TransactionBuilderError> {
    let token_program = spl_token::id();
    let init = |vault: &Pubkey, mint: &Pubkey| {
        spl_token::instruction::initialize_account3(&token_program, vault, mint, vault_signer)
            .map_err(|e| TransactionBuilderError::instruction_failed("spl-token", e.to_string()))
    };

    Ok(vec![
        system_instruction::create_account_with_seed(
            payer,
            &accounts.base_vault,
            payer,
            &format!("{}{}", accounts.seed, BASE_VAULT_SUFFIX),
            rent.token_account,
            TOKEN_ACCOUNT_SIZE as u64,
            &token_program,
        ),
        system_instruction::create_account_with_seed(
            payer,
            &accounts.quote_vault,
            payer,
            &format!("{}{}", accounts.seed, QUOTE_VAULT_SUFFIX),
            rent.token_account,
            TOKEN_ACCOUNT_SIZE as u64,
            &token_program,
        ),
        init(&accounts.base_vault, base_mint)?,
        init(&accounts.quote_vault, quote_mint)?,
    ])
}

/// Allocate the market, queues and order books, owned by the order-book program
pub fn create_market_account_instructions(
    payer: &Pubkey,
    accounts: &MarketAccounts,
    rent: &MarketRent,
    openbook: &Pubkey,
) -> Vec<Instruction> {
    let create = |address: &Pubkey, suffix: &str, lamports: u64, space: usize| {
        system_instruction::create_account_with_seed(
            payer,
            address,
            payer,
            &format!("{}{}", accounts.seed, suffix),
            lamports,
            space as u64,
            openbook,
        )
    };

    vec![
        create(&accounts.market, MARKET_SUFFIX, rent.market, MARKET_ACCOUNT_SIZE),
        create(&accounts.request_queue, REQUEST_QUEUE_SUFFIX, rent.request_queue, REQUEST_QUEUE_SIZE),
        create(&accounts.event_queue, EVENT_QUEUE_SUFFIX, rent.event_queue, EVENT_QUEUE_SIZE),
        create(&accounts.bids, BIDS_SUFFIX, rent.orderbook, ORDERBOOK_SIZE),
        create(&accounts.asks, ASKS_SUFFIX, rent.orderbook, ORDERBOOK_SIZE),
    ]
}

/// Tick and order size chosen for a supply magnitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSizing {
    pub tick_size: f64,
    pub order_size: f64,
}

/// Bracket table keyed by whole-token supply
///
/// Larger supplies trade at coarser ticks and larger minimum orders.
const SIZING_BRACKETS: [(u64, f64, f64); 7] = [
    (10_000, 0.001, 0.001),
    (100_000, 0.0001, 0.01),
    (1_000_000, 0.00001, 0.1),
    (10_000_000, 0.000001, 1.0),
    (100_000_000, 0.0000001, 10.0),
    (1_000_000_000, 0.00000001, 100.0),
    (10_000_000_000, 0.000000001, 1_000.0),
];
const TOP_BRACKET: (f64, f64) = (0.0000000001, 10_000.0);

pub fn sizing_for_supply(supply_tokens: u64) -> MarketSizing {
    let (tick_size, order_size) = SIZING_BRACKETS
        .iter()
        .find(|(ceiling, _, _)| supply_tokens <= *ceiling)
        .map(|&(_, tick, order)| (tick, order))
        .unwrap_or(TOP_BRACKET);
    MarketSizing {
        tick_size,
        order_size,
    }
}

/// Base and quote lot sizes in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotSizes {
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
}

/// # Errors
///
/// Fails when either lot rounds to zero for the given decimals.
pub fn lot_sizes(
    sizing: MarketSizing,
    base_decimals: u8,
    quote_decimals: u8,
) -> Result<LotSizes, TransactionBuilderError> {
    let base = (sizing.order_size * 10f64.powi(base_decimals as i32)).round();
    let quote = (sizing.tick_size * sizing.order_size * 10f64.powi(quote_decimals as i32)).round();

    let representable = |v: f64| v.is_finite() && v >= 1.0 && v <= u64::MAX as f64;
    if !representable(base) || !representable(quote) {
        return Err(TransactionBuilderError::validation(format!(
            "Lot sizes for tick {} / order {} do not fit {} base and {} quote decimals",
            sizing.tick_size, sizing.order_size, base_decimals, quote_decimals
        )));
    }

    Ok(LotSizes {
        base_lot_size: base as u64,
        quote_lot_size: quote as u64,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
struct InitializeMarketArgs {
    coin_lot_size: u64,
    pc_lot_size: u64,
    fee_rate_bps: u16,
    vault_signer_nonce: u64,
    pc_dust_threshold: u64,
}

/// Order-book `InitializeMarket`: version byte, u32 tag 0, packed args
#[allow(clippy::too_many_arguments)]
pub fn initialize_market_instruction(
    openbook: &Pubkey,
    accounts: &MarketAccounts,
    base_mint: &Pubkey,
    quote_mint: &Pubkey,
    lots: LotSizes,
    fee_rate_bps: u16,
    vault_signer_nonce: u64,
    pc_dust_threshold: u64,
) -> Result<Instruction, TransactionBuilderError> {
    let mut data = vec![0u8];
    data.extend_from_slice(&0u32.to_le_bytes());
    InitializeMarketArgs {
        coin_lot_size: lots.base_lot_size,
        pc_lot_size: lots.quote_lot_size,
        fee_rate_bps,
        vault_signer_nonce,
        pc_dust_threshold,
    }
    .serialize(&mut data)
    .map_err(|e| TransactionBuilderError::instruction_failed("openbook", e.to_string()))?;

    Ok(Instruction {
        program_id: *openbook,
        accounts: vec![
            AccountMeta::new(accounts.market, false),
            AccountMeta::new(accounts.request_queue, false),
            AccountMeta::new(accounts.event_queue, false),
            AccountMeta::new(accounts.bids, false),
            AccountMeta::new(accounts.asks, false),
            AccountMeta::new(accounts.base_vault, false),
            AccountMeta::new(accounts.quote_vault, false),
            AccountMeta::new_readonly(*base_mint, false),
            AccountMeta::new_readonly(*quote_mint, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data,
    })
}
