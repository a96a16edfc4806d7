//! Launchpad client library
//!
//! Client-side orchestration for presale projects: lifecycle status
//! derivation, a fee-aware transaction pipeline, the purchase, claim and
//! withdraw flows, and the checkpointed market-and-pool launch.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod flows;
pub mod metrics;
pub mod observability;
pub mod program;
pub mod rpc;
pub mod status;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod types;
pub mod wallet;
pub mod workflow;

// Re-export commonly used types
pub use error::{LaunchpadError, Result};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use status::derive_status;
pub use types::{CheckpointRecord, ProjectRecord, PurchaseReceipt, Status};
