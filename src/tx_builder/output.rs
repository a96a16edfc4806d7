//! Pipeline outputs
//!
//! `PreparedTransaction` is the compiled, unsigned message together with the
//! blockhash window it must confirm within. `ConfirmedTransaction` is what a
//! successful `build_and_send` returns.

use solana_sdk::{
    hash::Hash, message::VersionedMessage, pubkey::Pubkey, signature::Signature,
};

use crate::tx_builder::fee::FeeSource;

/// Compiled message ready for the wallet
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub message: VersionedMessage,
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: u64,
    pub fee_source: FeeSource,
}

impl PreparedTransaction {
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.message.static_account_keys().first()
    }

    /// Signers the wallet must provide, from `num_required_signatures`
    pub fn required_signers(&self) -> &[Pubkey] {
        let keys = self.message.static_account_keys();
        let required = self.message.header().num_required_signatures as usize;
        &keys[..required.min(keys.len())]
    }
}

/// Signature of a transaction observed at "confirmed" commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    pub signature: Signature,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{message::v0::Message as MessageV0, system_instruction};

    #[test]
    fn test_required_signers_is_fee_payer() {
        let payer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 5);
        let message = MessageV0::try_compile(&payer, &[ix], &[], Hash::new_unique()).unwrap();

        let prepared = PreparedTransaction {
            message: VersionedMessage::V0(message),
            blockhash: Hash::new_unique(),
            last_valid_block_height: 100,
            compute_unit_limit: None,
            compute_unit_price: 1,
            fee_source: FeeSource::Oracle,
        };

        assert_eq!(prepared.fee_payer(), Some(&payer));
        assert_eq!(prepared.required_signers(), &[payer]);
    }
}
