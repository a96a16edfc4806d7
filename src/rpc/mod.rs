//! Chain access
//!
//! `ChainRpc` is the explicit connection handle passed into every component.
//! There is no process-wide client; tests substitute a deterministic mock.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};

use crate::tx_builder::TransactionBuilderError;

pub mod solana;

pub use solana::SolanaRpc;

pub type RpcResult<T> = Result<T, TransactionBuilderError>;

/// Result of a dry run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub units_consumed: Option<u64>,
    /// Execution error reported by the node, if the instructions would fail
    pub err: Option<String>,
    pub logs: Vec<String>,
}

/// Confirmation state of a submitted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    /// Reached at least "confirmed" commitment
    pub confirmed: bool,
    /// Execution error, if the transaction landed and failed
    pub err: Option<String>,
}

/// Narrow async interface over the Solana JSON-RPC surface this crate uses
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Latest blockhash at "confirmed" commitment and its last valid block height
    async fn latest_blockhash(&self) -> RpcResult<(Hash, u64)>;

    /// Dry-run with signature verification off and the blockhash replaced
    async fn simulate(&self, tx: &VersionedTransaction) -> RpcResult<SimulationOutcome>;

    /// Submit with preflight disabled
    async fn send(&self, tx: &VersionedTransaction) -> RpcResult<Signature>;

    async fn signature_state(&self, signature: &Signature) -> RpcResult<Option<SignatureState>>;

    async fn block_height(&self) -> RpcResult<u64>;

    /// Native lamport balance
    async fn balance(&self, owner: &Pubkey) -> RpcResult<u64>;

    /// Raw amount of an SPL token account; zero if the account does not exist
    async fn token_balance(&self, token_account: &Pubkey) -> RpcResult<u64>;

    async fn rent_exempt_minimum(&self, space: usize) -> RpcResult<u64>;

    async fn account_exists(&self, address: &Pubkey) -> RpcResult<bool>;

    /// Raw account data; `None` if the account does not exist
    async fn account_data(&self, address: &Pubkey) -> RpcResult<Option<Vec<u8>>>;
}
