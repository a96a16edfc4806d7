//! Compute-unit simulation
//!
//! The draft runs against the network with a maximal compute limit prepended,
//! signature verification off and the blockhash replaced by the node. A failed
//! dry run yields `None`: the caller proceeds without a tightened limit and the
//! real send reports the true error.

use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::MAX_COMPUTE_UNIT_LIMIT;
use crate::rpc::ChainRpc;

#[derive(Clone)]
pub struct ComputeSimulator {
    rpc: Arc<dyn ChainRpc>,
}

impl ComputeSimulator {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self { rpc }
    }

    /// Units the draft actually consumes, or `None` if the dry run failed
    pub async fn simulate(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        lookup_tables: &[AddressLookupTableAccount],
    ) -> Option<u64> {
        let sim_tx = match build_simulation_tx(instructions, payer, lookup_tables) {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "Could not compile simulation transaction");
                return None;
            }
        };

        match self.rpc.simulate(&sim_tx).await {
            Ok(outcome) => {
                if let Some(err) = outcome.err {
                    debug!(error = %err, logs = outcome.logs.len(), "Simulation reported an execution error");
                    return None;
                }
                debug!(units = ?outcome.units_consumed, "Simulation succeeded");
                outcome.units_consumed
            }
            Err(e) => {
                debug!(error = %e, "Simulation request failed, using default CU limit");
                None
            }
        }
    }
}

/// Draft prefixed with the ceiling compute limit, placeholder signatures
pub fn build_simulation_tx(
    instructions: &[Instruction],
    payer: &Pubkey,
    lookup_tables: &[AddressLookupTableAccount],
) -> Result<VersionedTransaction, String> {
    let mut sim_ixs = Vec::with_capacity(instructions.len() + 1);
    sim_ixs.push(ComputeBudgetInstruction::set_compute_unit_limit(
        MAX_COMPUTE_UNIT_LIMIT,
    ));
    sim_ixs.extend_from_slice(instructions);

    let message = MessageV0::try_compile(payer, &sim_ixs, lookup_tables, Hash::default())
        .map_err(|e| e.to_string())?;
    let required = message.header.num_required_signatures as usize;

    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::V0(message),
    })
}
