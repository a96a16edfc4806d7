//! User-facing operations
//!
//! Every flow gates on the project's derived status and does its local
//! validation before the first network call, then hands one draft to the
//! `TransactionBuilder`.

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

use crate::config::ProgramIds;
use crate::error::{LaunchpadError, Result};
use crate::rpc::ChainRpc;
use crate::status::derive_status;
use crate::tx_builder::TransactionBuilder;
use crate::types::{ProjectRecord, Status};

pub mod claim;
pub mod launch;
pub mod purchase;
pub mod withdraw;

pub use claim::ClaimFlow;
pub use launch::{LaunchOutcome, LaunchPhase, MarketLaunchOrchestrator};
pub use purchase::PurchaseFlow;
pub use withdraw::WithdrawFlow;

/// Handles shared by every flow
#[derive(Clone)]
pub struct FlowContext {
    pub builder: TransactionBuilder,
    pub programs: ProgramIds,
}

impl FlowContext {
    pub fn new(builder: TransactionBuilder, programs: ProgramIds) -> Self {
        Self { builder, programs }
    }

    pub fn rpc(&self) -> &Arc<dyn ChainRpc> {
        self.builder.rpc()
    }
}

/// Derived status, if `allowed` accepts it
pub(crate) fn require_status(
    operation: &'static str,
    record: &ProjectRecord,
    now: i64,
    allowed: impl Fn(Status) -> bool,
) -> Result<Status> {
    match derive_status(record, now) {
        Some(status) if allowed(status) => Ok(status),
        other => Err(LaunchpadError::invalid_status(operation, other)),
    }
}

pub(crate) fn require_signer(expected: &Pubkey, actual: &Pubkey, what: &str) -> Result<()> {
    if expected != actual {
        return Err(LaunchpadError::Unauthorized(format!(
            "{what} must be signed by {expected}, wallet is {actual}"
        )));
    }
    Ok(())
}
