//! Typed instruction builders for the programs the flows talk to

pub mod amm;
pub mod launchpad;
pub mod market;
pub mod pda;

pub use amm::AmmAccounts;
pub use launchpad::{LaunchpadInstruction, ToAccountMetas};
pub use market::{LotSizes, MarketAccounts, MarketSizing};
