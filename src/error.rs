//! Crate-level error type for the flows and the launch workflow

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::tx_builder::TransactionBuilderError;
use crate::types::Status;

#[derive(Error, Debug)]
pub enum LaunchpadError {
    /// Local pre-flight rejection; nothing was built or sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The project's derived status does not allow the operation
    #[error("{operation} is not available while the project is {status}")]
    InvalidStatus {
        operation: &'static str,
        status: String,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The project already has a liquidity pool
    #[error("Project {project} has already been launched")]
    AlreadyLaunched { project: Pubkey },

    /// A checkpoint exists but phase-2 preconditions do not hold
    ///
    /// Requires manual intervention; phase 1 is never re-run.
    #[error("Checkpoint for {project} is inconsistent: {reason}")]
    CheckpointInconsistency { project: Pubkey, reason: String },

    #[error("Checkpoint storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transaction(#[from] TransactionBuilderError),
}

pub type Result<T> = std::result::Result<T, LaunchpadError>;

impl LaunchpadError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transaction(e) => e.is_retryable(),
            Self::Storage(_) => true,
            Self::Validation(_)
            | Self::InvalidStatus { .. }
            | Self::Unauthorized(_)
            | Self::AlreadyLaunched { .. }
            | Self::CheckpointInconsistency { .. }
            | Self::Configuration(_) => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidStatus { .. } => "invalid_status",
            Self::Unauthorized(_) => "unauthorized",
            Self::AlreadyLaunched { .. } => "already_launched",
            Self::CheckpointInconsistency { .. } => "checkpoint_inconsistency",
            Self::Storage(_) => "storage",
            Self::Configuration(_) => "configuration",
            Self::Transaction(e) => e.category(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn invalid_status(operation: &'static str, status: Option<Status>) -> Self {
        Self::InvalidStatus {
            operation,
            status: status
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "undetermined".to_string()),
        }
    }

    pub fn inconsistent(project: Pubkey, reason: impl Into<String>) -> Self {
        Self::CheckpointInconsistency {
            project,
            reason: reason.into(),
        }
    }
}

impl From<sled::Error> for LaunchpadError {
    fn from(e: sled::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LaunchpadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("checkpoint encoding: {e}"))
    }
}
