//! Compute-budget planning and ordering validation
//!
//! Final transactions are laid out as:
//! 1. `set_compute_unit_limit` (only when simulation produced a figure)
//! 2. `set_compute_unit_price`
//! 3. The caller's draft instructions, in their original order

use crate::tx_builder::errors::TransactionBuilderError;
use solana_sdk::{compute_budget::ComputeBudgetInstruction, instruction::Instruction};

/// Compute budget program discriminators
const SET_COMPUTE_UNIT_LIMIT_TAG: u8 = 2;
const SET_COMPUTE_UNIT_PRICE_TAG: u8 = 3;

/// Planned instruction list with the compute-budget values that went into it
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: u64,
}

/// `ceil(consumed * (100 + margin) / 100)`, capped at `max_units`
///
/// With the default 10% margin, 100_000 consumed units become 110_000.
pub fn compute_unit_limit_with_margin(consumed: u64, margin_percent: u32, max_units: u32) -> u32 {
    let scaled = consumed as u128 * (100 + margin_percent as u128);
    let limit = scaled.div_ceil(100);
    limit.min(max_units as u128) as u32
}

/// Prepend compute-budget instructions to a draft
///
/// # Errors
///
/// Returns `TransactionBuilderError::Validation` if the draft is empty or
/// already carries compute-budget instructions of its own.
pub fn plan_compute_budget(
    draft: Vec<Instruction>,
    compute_unit_price: u64,
    compute_unit_limit: Option<u32>,
) -> Result<InstructionPlan, TransactionBuilderError> {
    if draft.is_empty() {
        return Err(TransactionBuilderError::validation(
            "Draft transaction has no instructions",
        ));
    }
    if draft.iter().any(is_compute_budget) {
        return Err(TransactionBuilderError::validation(
            "Draft must not contain compute budget instructions",
        ));
    }

    let mut instructions = Vec::with_capacity(draft.len() + 2);
    if let Some(limit) = compute_unit_limit {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(limit));
    }
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
        compute_unit_price,
    ));
    instructions.extend(draft);

    Ok(InstructionPlan {
        instructions,
        compute_unit_limit,
        compute_unit_price,
    })
}

fn is_compute_budget(ix: &Instruction) -> bool {
    ix.program_id == solana_sdk::compute_budget::id()
}

/// Validate compute-budget placement (debug/test only)
///
/// Compute-budget instructions must all precede program instructions and each
/// kind may appear at most once.
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(instructions: &[Instruction]) -> Result<(), TransactionBuilderError> {
    if instructions.is_empty() {
        return Err(TransactionBuilderError::validation("Instruction list is empty"));
    }

    let mut seen_program_ix = false;
    let mut limits = 0;
    let mut prices = 0;

    for (idx, ix) in instructions.iter().enumerate() {
        if !is_compute_budget(ix) {
            seen_program_ix = true;
            continue;
        }
        if seen_program_ix {
            return Err(TransactionBuilderError::validation(format!(
                "Compute budget instruction at position {} follows a program instruction",
                idx
            )));
        }
        match ix.data.first() {
            Some(&SET_COMPUTE_UNIT_LIMIT_TAG) => limits += 1,
            Some(&SET_COMPUTE_UNIT_PRICE_TAG) => prices += 1,
            _ => {}
        }
    }

    if limits > 1 || prices > 1 {
        return Err(TransactionBuilderError::validation(format!(
            "Duplicate compute budget instructions (limit={}, price={})",
            limits, prices
        )));
    }
    Ok(())
}

#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_ix_order(_instructions: &[Instruction]) -> Result<(), TransactionBuilderError> {
    Ok(())
}

/// Decode the limit set by a compute-budget instruction
pub fn read_compute_unit_limit(ix: &Instruction) -> Option<u32> {
    if !is_compute_budget(ix) || ix.data.first() != Some(&SET_COMPUTE_UNIT_LIMIT_TAG) {
        return None;
    }
    Some(u32::from_le_bytes(ix.data.get(1..5)?.try_into().ok()?))
}

/// Decode the price set by a compute-budget instruction
pub fn read_compute_unit_price(ix: &Instruction) -> Option<u64> {
    if !is_compute_budget(ix) || ix.data.first() != Some(&SET_COMPUTE_UNIT_PRICE_TAG) {
        return None;
    }
    Some(u64::from_le_bytes(ix.data.get(1..9)?.try_into().ok()?))
}
