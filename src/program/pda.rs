//! Program-derived addresses of the launchpad program

use solana_sdk::pubkey::Pubkey;

pub const PROJECT_AUTHORITY_SEED: &[u8] = b"authority";
pub const QUOTE_VAULT_SEED: &[u8] = b"quote_vault";
pub const TOKEN_VAULT_SEED: &[u8] = b"token_vault";
pub const LP_VAULT_SEED: &[u8] = b"lp_vault";
pub const RECEIPT_SEED: &[u8] = b"receipt";

/// PDA that owns the project's vaults and signs CPIs
pub fn project_authority(program_id: &Pubkey, project: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PROJECT_AUTHORITY_SEED, project.as_ref()], program_id)
}

/// Vault holding contributed quote currency
pub fn quote_vault(program_id: &Pubkey, project: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[QUOTE_VAULT_SEED, project.as_ref()], program_id)
}

/// Vault holding the reward token supply
pub fn token_vault(program_id: &Pubkey, project: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[TOKEN_VAULT_SEED, project.as_ref()], program_id)
}

/// Vault receiving LP tokens minted at launch
pub fn lp_vault(program_id: &Pubkey, project: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LP_VAULT_SEED, project.as_ref()], program_id)
}

/// One backer's purchase receipt
pub fn purchase_receipt(program_id: &Pubkey, project: &Pubkey, buyer: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[RECEIPT_SEED, project.as_ref(), buyer.as_ref()],
        program_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipts_are_per_buyer() {
        let program = Pubkey::new_unique();
        let project = Pubkey::new_unique();

        let (a, _) = purchase_receipt(&program, &project, &Pubkey::new_unique());
        let (b, _) = purchase_receipt(&program, &project, &Pubkey::new_unique());
        assert_ne!(a, b);

        let buyer = Pubkey::new_unique();
        assert_eq!(
            purchase_receipt(&program, &project, &buyer),
            purchase_receipt(&program, &project, &buyer)
        );
    }

    #[test]
    fn test_vaults_are_distinct() {
        let program = Pubkey::new_unique();
        let project = Pubkey::new_unique();
        let quote = quote_vault(&program, &project).0;
        let token = token_vault(&program, &project).0;
        let lp = lp_vault(&program, &project).0;
        assert_ne!(quote, token);
        assert_ne!(token, lp);
        assert!(!quote.is_on_curve());
    }
}
