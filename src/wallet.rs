//! Wallet / signing collaborator
//!
//! Signing is the dominant suspension point of every flow: a browser wallet
//! may wait on the user indefinitely or be declined. Declines are reported as
//! `WalletError::Rejected` and never treated as crashes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    message::VersionedMessage,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("user rejected the request: {0}")]
    Rejected(String),

    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    #[error("signing failed: {0}")]
    Failed(String),
}

/// Async signer that turns a compiled message into a signed transaction
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Fee payer and signing key
    fn pubkey(&self) -> Pubkey;

    async fn sign_message(&self, message: VersionedMessage)
        -> Result<VersionedTransaction, WalletError>;
}

/// Wallet backed by a local keypair
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
}

impl KeypairWallet {
    /// Load a keypair file (JSON byte array or raw 64 bytes)
    pub fn from_file(path: &str) -> Result<Self> {
        let keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let bytes = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else {
            serde_json::from_slice::<Vec<u8>>(&keypair_bytes)
                .context("Failed to parse keypair JSON")?
        };

        if bytes.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }

        let keypair = Keypair::try_from(bytes.as_slice()).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl Clone for KeypairWallet {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_message(
        &self,
        message: VersionedMessage,
    ) -> Result<VersionedTransaction, WalletError> {
        VersionedTransaction::try_new(message, &[self.keypair.as_ref()])
            .map_err(|e| WalletError::Failed(e.to_string()))
    }
}
