//! Test Utilities Module
//!
//! Deterministic stand-ins for the chain, the fee oracle and the wallet.
//! Nothing here touches the network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::VersionedMessage,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::rpc::{ChainRpc, RpcResult, SignatureState, SimulationOutcome};
use crate::tx_builder::fee::{PriorityFeeOracle, PriorityLevel};
use crate::tx_builder::program_errors::ProgramErrorTable;
use crate::tx_builder::TransactionBuilderError;
use crate::wallet::{WalletError, WalletSigner};

/// How `signature_state` answers for submitted transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockConfirmation {
    Confirmed,
    /// Landed with this error string
    Failed(String),
    /// Never observed; pair with a block height past the last valid one
    Never,
}

struct MockChainState {
    units_consumed: Option<u64>,
    simulation_error: Option<String>,
    simulate_calls: usize,
    blockhash: Hash,
    last_valid_block_height: u64,
    block_height: u64,
    confirmation: MockConfirmation,
    send_attempts: usize,
    send_failures: HashMap<usize, String>,
    sent: Vec<VersionedTransaction>,
    balances: HashMap<Pubkey, u64>,
    token_balances: HashMap<Pubkey, u64>,
    accounts: HashSet<Pubkey>,
    account_data: HashMap<Pubkey, Vec<u8>>,
    block_height_error: Option<String>,
    total_calls: usize,
}

/// In-memory chain
///
/// Every static account key of a sent transaction is recorded as existing,
/// which is enough for the launch workflow's existence checks.
pub struct MockChainRpc {
    state: Mutex<MockChainState>,
}

impl MockChainRpc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockChainState {
                units_consumed: Some(200_000),
                simulation_error: None,
                simulate_calls: 0,
                blockhash: Hash::new_unique(),
                last_valid_block_height: 1_000,
                block_height: 900,
                confirmation: MockConfirmation::Confirmed,
                send_attempts: 0,
                send_failures: HashMap::new(),
                sent: Vec::new(),
                balances: HashMap::new(),
                token_balances: HashMap::new(),
                accounts: HashSet::new(),
                account_data: HashMap::new(),
                block_height_error: None,
                total_calls: 0,
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockChainState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn call<R>(&self, f: impl FnOnce(&mut MockChainState) -> R) -> R {
        self.with(|s| {
            s.total_calls += 1;
            f(s)
        })
    }

    pub fn set_units_consumed(&self, units: Option<u64>) {
        self.with(|s| s.units_consumed = units);
    }

    pub fn set_simulation_error(&self, err: Option<String>) {
        self.with(|s| s.simulation_error = err);
    }

    pub fn set_confirmation(&self, confirmation: MockConfirmation) {
        self.with(|s| s.confirmation = confirmation);
    }

    pub fn set_last_valid_block_height(&self, height: u64) {
        self.with(|s| s.last_valid_block_height = height);
    }

    pub fn set_block_height(&self, height: u64) {
        self.with(|s| s.block_height = height);
    }

    /// Make the n-th send attempt (1-based) fail with `message`
    pub fn fail_send_number(&self, attempt: usize, message: &str) {
        self.with(|s| s.send_failures.insert(attempt, message.to_string()));
    }

    pub fn set_balance(&self, owner: Pubkey, lamports: u64) {
        self.with(|s| s.balances.insert(owner, lamports));
    }

    pub fn set_token_balance(&self, account: Pubkey, amount: u64) {
        self.with(|s| s.token_balances.insert(account, amount));
    }

    pub fn add_account(&self, address: Pubkey) {
        self.with(|s| s.accounts.insert(address));
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.with(|s| {
            s.accounts.remove(address);
            s.account_data.remove(address);
        });
    }

    /// Create or overwrite an account with `data`
    pub fn set_account_data(&self, address: Pubkey, data: Vec<u8>) {
        self.with(|s| {
            s.accounts.insert(address);
            s.account_data.insert(address, data);
        });
    }

    /// Make every `block_height` call fail with `message`
    pub fn fail_block_height(&self, message: &str) {
        self.with(|s| s.block_height_error = Some(message.to_string()));
    }

    pub fn blockhash(&self) -> Hash {
        self.with(|s| s.blockhash)
    }

    pub fn simulate_calls(&self) -> usize {
        self.with(|s| s.simulate_calls)
    }

    pub fn sent_transactions(&self) -> Vec<VersionedTransaction> {
        self.with(|s| s.sent.clone())
    }

    /// Every trait call made so far, reads included
    pub fn total_calls(&self) -> usize {
        self.with(|s| s.total_calls)
    }
}

impl Default for MockChainRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    async fn latest_blockhash(&self) -> RpcResult<(Hash, u64)> {
        Ok(self.call(|s| (s.blockhash, s.last_valid_block_height)))
    }

    async fn simulate(&self, _tx: &VersionedTransaction) -> RpcResult<SimulationOutcome> {
        Ok(self.call(|s| {
            s.simulate_calls += 1;
            SimulationOutcome {
                units_consumed: s.units_consumed,
                err: s.simulation_error.clone(),
                logs: Vec::new(),
            }
        }))
    }

    async fn send(&self, tx: &VersionedTransaction) -> RpcResult<Signature> {
        self.call(|s| {
            s.send_attempts += 1;
            if let Some(message) = s.send_failures.get(&s.send_attempts) {
                return Err(ProgramErrorTable::launchpad()
                    .classify(message)
                    .unwrap_or_else(|| TransactionBuilderError::Submission(message.clone())));
            }
            s.accounts
                .extend(tx.message.static_account_keys().iter().copied());
            s.sent.push(tx.clone());
            Ok(tx.signatures.first().copied().unwrap_or_default())
        })
    }

    async fn signature_state(&self, _signature: &Signature) -> RpcResult<Option<SignatureState>> {
        Ok(self.call(|s| match &s.confirmation {
            MockConfirmation::Confirmed => Some(SignatureState {
                confirmed: true,
                err: None,
            }),
            MockConfirmation::Failed(err) => Some(SignatureState {
                confirmed: true,
                err: Some(err.clone()),
            }),
            MockConfirmation::Never => None,
        }))
    }

    async fn block_height(&self) -> RpcResult<u64> {
        self.call(|s| match &s.block_height_error {
            Some(message) => Err(TransactionBuilderError::Rpc(message.clone())),
            None => Ok(s.block_height),
        })
    }

    async fn balance(&self, owner: &Pubkey) -> RpcResult<u64> {
        Ok(self.call(|s| s.balances.get(owner).copied().unwrap_or(0)))
    }

    async fn token_balance(&self, token_account: &Pubkey) -> RpcResult<u64> {
        Ok(self.call(|s| s.token_balances.get(token_account).copied().unwrap_or(0)))
    }

    async fn rent_exempt_minimum(&self, space: usize) -> RpcResult<u64> {
        Ok(self.call(|_| ((128 + space) as u64) * 3_480 * 2))
    }

    async fn account_exists(&self, address: &Pubkey) -> RpcResult<bool> {
        Ok(self.call(|s| s.accounts.contains(address)))
    }

    /// Accounts created by a sent transaction carry no data
    async fn account_data(&self, address: &Pubkey) -> RpcResult<Option<Vec<u8>>> {
        Ok(self.call(|s| {
            s.accounts
                .contains(address)
                .then(|| s.account_data.get(address).cloned().unwrap_or_default())
        }))
    }
}

/// AMM v4 pool state holding only `pool_open_time`
pub fn amm_pool_data(open_time: u64) -> Vec<u8> {
    let offset = crate::program::amm::POOL_OPEN_TIME_OFFSET;
    let mut data = vec![0u8; 752];
    data[offset..offset + 8].copy_from_slice(&open_time.to_le_bytes());
    data
}

/// Fee oracle returning a fixed estimate or a fixed failure
pub struct MockFeeOracle {
    result: Result<f64, String>,
    last_level: Mutex<Option<PriorityLevel>>,
    calls: AtomicUsize,
}

impl MockFeeOracle {
    pub fn returning(estimate: f64) -> Self {
        Self {
            result: Ok(estimate),
            last_level: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err("oracle unavailable".to_string()),
            last_level: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn last_level(&self) -> Option<PriorityLevel> {
        *self.last_level.lock().unwrap()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriorityFeeOracle for MockFeeOracle {
    async fn priority_fee_estimate(
        &self,
        _serialized_tx: &str,
        level: PriorityLevel,
    ) -> Result<f64, TransactionBuilderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_level.lock().unwrap() = Some(level);
        self.result
            .clone()
            .map_err(TransactionBuilderError::Estimation)
    }
}

/// Wallet that signs with an in-memory keypair, or declines every request
pub struct MockWallet {
    keypair: Arc<Keypair>,
    rejecting: bool,
    sign_calls: AtomicUsize,
}

impl MockWallet {
    pub fn new() -> Self {
        Self::from_keypair(Keypair::new())
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
            rejecting: false,
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            rejecting: true,
            ..Self::new()
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_message(
        &self,
        message: VersionedMessage,
    ) -> Result<VersionedTransaction, WalletError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.rejecting {
            return Err(WalletError::Rejected("User rejected the request.".into()));
        }
        VersionedTransaction::try_new(message, &[self.keypair.as_ref()])
            .map_err(|e| WalletError::Failed(e.to_string()))
    }
}

/// Rebuild the instructions of a transaction compiled without lookup tables
pub fn decompile(tx: &VersionedTransaction) -> Vec<Instruction> {
    let keys = tx.message.static_account_keys();
    let header = tx.message.header();
    let signed = header.num_required_signatures as usize;
    let readonly_signed = header.num_readonly_signed_accounts as usize;
    let readonly_unsigned = header.num_readonly_unsigned_accounts as usize;

    let meta = |index: usize| {
        let is_signer = index < signed;
        let is_writable = if is_signer {
            index < signed - readonly_signed
        } else {
            index < keys.len() - readonly_unsigned
        };
        AccountMeta {
            pubkey: keys[index],
            is_signer,
            is_writable,
        }
    };

    tx.message
        .instructions()
        .iter()
        .map(|ci| Instruction {
            program_id: keys[ci.program_id_index as usize],
            accounts: ci.accounts.iter().map(|&i| meta(i as usize)).collect(),
            data: ci.data.clone(),
        })
        .collect()
}

/// Instructions of the sent transactions that target `program_id`
pub fn sent_instructions_for(rpc: &MockChainRpc, program_id: &Pubkey) -> Vec<Instruction> {
    rpc.sent_transactions()
        .iter()
        .flat_map(decompile)
        .filter(|ix| ix.program_id == *program_id)
        .collect()
}
