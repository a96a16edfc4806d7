//! Transaction pipeline
//!
//! Turns a draft instruction list into a confirmed signature:
//! - **fee**: priority fee oracle and fallback policy
//! - **simulate**: compute-unit dry run
//! - **instructions**: compute-budget planning and ordering validation
//! - **context**: fan-in of the concurrent pre-send lookups
//! - **builder**: sign, send and confirmation polling
//! - **program_errors**: custom error code to IDL message mapping
//! - **errors**: error taxonomy shared by every stage

pub mod errors;
pub use errors::TransactionBuilderError;

mod builder;
mod context;
pub mod fee;
pub mod instructions;
mod output;
pub mod program_errors;
pub mod simulate;

pub use builder::TransactionBuilder;
pub use context::BuildInputs;
pub use fee::{
    FeeEstimator, FeeQuote, FeeSource, HttpPriorityFeeOracle, PriorityFeeOracle, PriorityLevel,
};
pub use instructions::{sanity_check_ix_order, InstructionPlan};
pub use output::{ConfirmedTransaction, PreparedTransaction};
pub use program_errors::{describe_program_error, ProgramErrorTable};
pub use simulate::ComputeSimulator;
