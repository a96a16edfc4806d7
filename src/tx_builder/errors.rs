//! Error types for the transaction pipeline
//!
//! Every stage of `build_and_send` maps its failure onto one variant so the
//! caller can tell "nothing landed, retry from scratch" apart from "outcome
//! unknown, re-check before retrying".

use solana_sdk::signature::Signature;
use thiserror::Error;

/// Error type for fee estimation, simulation, signing, submission and confirmation
#[derive(Error, Debug)]
pub enum TransactionBuilderError {
    /// Local pre-flight rejection; no network call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Priority-fee oracle failed and no fallback price is configured
    #[error("Fee estimation failed: {0}")]
    Estimation(String),

    /// The wallet holder declined to sign
    ///
    /// Normal, recoverable outcome with no on-chain effect.
    #[error("Signing rejected by wallet: {0}")]
    SigningRejected(String),

    /// The signing collaborator failed for reasons other than a decline
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Failed to fetch a recent blockhash
    #[error("Blockhash error: {0}")]
    Blockhash(String),

    /// The node refused the transaction; nothing landed
    #[error("Submission failed: {0}")]
    Submission(String),

    /// The blockhash expired before confirmation was observed
    ///
    /// The transaction may still have landed. Never retry automatically.
    #[error("Confirmation timed out for {signature}; check the transaction before retrying")]
    ConfirmationTimeout { signature: Signature },

    /// The transaction landed but failed with a non-program error
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    /// On-chain program rejected an instruction with a custom error code
    #[error("Program error {code} ({name}): {message}")]
    Program {
        code: u32,
        name: String,
        message: String,
    },

    /// Failed to build or compile an instruction
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild { program: String, reason: String },

    /// RPC transport or response error on a read
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionBuilderError {
    /// Whether starting the whole attempt over may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Estimation(_) => true,
            Self::Blockhash(_) => true,
            Self::Submission(_) => true,
            Self::Rpc(_) => true,
            Self::SigningRejected(_) => true,

            Self::Validation(_) => false,
            Self::Signing(_) => false,
            Self::ConfirmationTimeout { .. } => false,
            Self::TransactionFailed { .. } => false,
            Self::Program { .. } => false,
            Self::InstructionBuild { .. } => false,
            Self::Internal(_) => false,
        }
    }

    /// Whether the outcome on-chain is unknown
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::ConfirmationTimeout { .. })
    }

    /// Error category for metrics and logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Estimation(_) => "estimation",
            Self::SigningRejected(_) => "signing_rejected",
            Self::Signing(_) => "signing",
            Self::Blockhash(_) => "blockhash",
            Self::Submission(_) => "submission",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::Program { .. } => "program",
            Self::InstructionBuild { .. } => "instruction",
            Self::Rpc(_) => "rpc",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl TransactionBuilderError {
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}
