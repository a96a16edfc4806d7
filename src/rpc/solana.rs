//! `ChainRpc` over the nonblocking Solana RPC client

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, warn};

use super::{ChainRpc, RpcResult, SignatureState, SimulationOutcome};
use crate::config::RpcConfig;
use crate::tx_builder::program_errors::ProgramErrorTable;
use crate::tx_builder::TransactionBuilderError;

/// Production RPC handle
#[derive(Clone)]
pub struct SolanaRpc {
    client: Arc<RpcClient>,
    blockhash_retries: usize,
}

impl SolanaRpc {
    pub fn new(config: &RpcConfig) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            CommitmentConfig::confirmed(),
        );
        Self {
            client: Arc::new(client),
            blockhash_retries: config.blockhash_retries,
        }
    }

    pub fn from_client(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            blockhash_retries: 3,
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

fn rpc_err(e: impl std::fmt::Display) -> TransactionBuilderError {
    TransactionBuilderError::Rpc(e.to_string())
}

#[async_trait]
impl ChainRpc for SolanaRpc {
    async fn latest_blockhash(&self) -> RpcResult<(Hash, u64)> {
        // read-only, safe to retry
        let strategy = ExponentialBackoff::from_millis(50)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(self.blockhash_retries);

        Retry::spawn(strategy, || async {
            self.client
                .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
                .await
                .inspect_err(|e| debug!(error = %e, "Blockhash fetch failed, retrying"))
        })
        .await
        .map_err(|e| TransactionBuilderError::Blockhash(e.to_string()))
    }

    async fn simulate(&self, tx: &VersionedTransaction) -> RpcResult<SimulationOutcome> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        };

        let response = self
            .client
            .simulate_transaction_with_config(tx, config)
            .await
            .map_err(rpc_err)?;

        Ok(SimulationOutcome {
            units_consumed: response.value.units_consumed,
            err: response.value.err.map(|e| e.to_string()),
            logs: response.value.logs.unwrap_or_default(),
        })
    }

    async fn send(&self, tx: &VersionedTransaction) -> RpcResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            ..Default::default()
        };

        self.client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(|e| {
                let raw = e.to_string();
                ProgramErrorTable::launchpad()
                    .classify(&raw)
                    .unwrap_or(TransactionBuilderError::Submission(raw))
            })
    }

    async fn signature_state(&self, signature: &Signature) -> RpcResult<Option<SignatureState>> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(rpc_err)?;

        Ok(response.value.into_iter().next().flatten().map(|status| {
            SignatureState {
                confirmed: status.satisfies_commitment(CommitmentConfig::confirmed()),
                err: status.err.map(|e| e.to_string()),
            }
        }))
    }

    async fn block_height(&self) -> RpcResult<u64> {
        self.client.get_block_height().await.map_err(rpc_err)
    }

    async fn balance(&self, owner: &Pubkey) -> RpcResult<u64> {
        self.client.get_balance(owner).await.map_err(rpc_err)
    }

    async fn token_balance(&self, token_account: &Pubkey) -> RpcResult<u64> {
        match self.client.get_token_account_balance(token_account).await {
            Ok(amount) => amount
                .amount
                .parse::<u64>()
                .map_err(|e| rpc_err(format!("bad token amount {}: {e}", amount.amount))),
            Err(e) => {
                if self.account_exists(token_account).await? {
                    Err(rpc_err(e))
                } else {
                    warn!(account = %token_account, "Token account missing, treating balance as zero");
                    Ok(0)
                }
            }
        }
    }

    async fn rent_exempt_minimum(&self, space: usize) -> RpcResult<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(space)
            .await
            .map_err(rpc_err)
    }

    async fn account_exists(&self, address: &Pubkey) -> RpcResult<bool> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(rpc_err)?;
        Ok(response.value.is_some())
    }

    async fn account_data(&self, address: &Pubkey) -> RpcResult<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(rpc_err)?;
        Ok(response.value.map(|account| account.data))
    }
}
