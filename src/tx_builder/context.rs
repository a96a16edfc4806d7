//! Fan-in of the three independent pre-send lookups
//!
//! Fee estimation, compute simulation and the blockhash fetch have no ordering
//! dependency between them. They run concurrently and land in named slots;
//! nothing downstream runs until all three have resolved.

use solana_sdk::hash::Hash;
use std::fmt;

use crate::observability::TraceContext;
use crate::tx_builder::fee::FeeQuote;

/// Joined results of the concurrent lookups for one transaction
pub struct BuildInputs {
    /// Priority price from the fee oracle (or its fallback)
    pub fee: FeeQuote,

    /// Units consumed in the dry run; `None` means no tightened limit
    pub consumed_units: Option<u64>,

    /// Blockhash at "confirmed" commitment
    pub blockhash: Hash,

    /// Block height after which `blockhash` is no longer accepted
    pub last_valid_block_height: u64,

    pub trace_context: TraceContext,
}

impl fmt::Debug for BuildInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildInputs")
            .field("fee", &self.fee)
            .field("consumed_units", &self.consumed_units)
            .field("blockhash", &self.blockhash)
            .field("last_valid_block_height", &self.last_valid_block_height)
            .field(
                "trace_context",
                &format!(
                    "trace_id={}, span_id={}",
                    self.trace_context.trace_id, self.trace_context.span_id
                ),
            )
            .finish()
    }
}
