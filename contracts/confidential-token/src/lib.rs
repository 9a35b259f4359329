//! # Confidential Token Contract
//!
//! Account-based token whose balances and transfer amounts are encrypted.
//! The contract only ever holds ciphertext handles; arithmetic runs through
//! an [`fhe::FheOps`] backend and decryption through a
//! [`fhe::DecryptionOracle`] that honors per-handle grants.
//!
//! ## Transfer Flow
//! 1. Client encrypts the amount with [`input::InputBuilder`]
//! 2. Relayer attests the ciphertext for `(contract, caller)`
//! 3. Caller invokes `transfer(recipient, amount, proof)`
//! 4. The engine compares the amount against the encrypted balance and moves
//!    either the amount or an encrypted zero, without learning which
//! 5. Sender and recipient decrypt the executed amount through `user_decrypt`
//!
//! ## Security
//! - Only the owner can manage the allowlist and mint
//! - Both parties of a transfer must be allowlisted
//! - Insufficient funds never fail a transfer; they move zero
//! - The bundled [`coprocessor::Coprocessor`] stores cleartexts and is for
//!   development only

use near_contract_standards::fungible_token::metadata::{
    FungibleTokenMetadata, FungibleTokenMetadataProvider,
};
use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::collections::LazyOption;
use near_sdk::json_types::U64;
use near_sdk::{env, log, near_bindgen, AccountId, BorshStorageKey, PanicOnDefault};

pub mod access;
pub mod config;
pub mod coprocessor;
pub mod engine;
pub mod error;
pub mod events;
pub mod fhe;
pub mod input;
pub mod ledger;

#[cfg(test)]
mod testing;

use access::{Allowlist, Authority};
use config::{SelfTransferPolicy, TokenConfig};
use coprocessor::Coprocessor;
use engine::{Minter, TransferEngine, TransferPlan, TransferRequest};
use error::TokenError;
use events::TokenEvent;
use fhe::{CipherHandle, DecryptionOracle, Euint64, FheOps};
use input::{EncryptedInput, InputProof, InputVerifier};
use ledger::BalanceLedger;

#[derive(BorshStorageKey, BorshSerialize)]
#[borsh(crate = "near_sdk::borsh")]
pub enum StorageKey {
    Allowlist,
    Balances,
    Ciphertexts,
    Grants,
    Metadata,
}

#[near_bindgen]
#[derive(BorshDeserialize, BorshSerialize, PanicOnDefault)]
#[borsh(crate = "near_sdk::borsh")]
pub struct ConfidentialToken {
    /// Holder of the privileged role
    authority: Authority,
    allowlist: Allowlist,
    /// Encrypted balance per account
    ledger: BalanceLedger,
    /// Ciphertext store, grants and input verifier
    fhe: Coprocessor,
    /// Sum of all mints; public because mint amounts are
    total_supply: u64,
    self_transfer: SelfTransferPolicy,
    metadata: LazyOption<FungibleTokenMetadata>,
}

#[near_bindgen]
impl ConfidentialToken {
    /// Initialize the token. Panics on a malformed verifier key.
    #[init]
    pub fn new(config: TokenConfig) -> Self {
        let verifier = InputVerifier::from_hex(&config.input_verifier)
            .unwrap_or_else(|err| env::panic_str(err.as_str()));
        let metadata = config.metadata();

        log!(
            "Initialized {} ({}) owned by {}",
            metadata.name,
            metadata.symbol,
            config.owner_id
        );

        Self {
            authority: Authority::new(config.owner_id),
            allowlist: Allowlist::new(StorageKey::Allowlist),
            ledger: BalanceLedger::new(StorageKey::Balances),
            fhe: Coprocessor::new(StorageKey::Ciphertexts, StorageKey::Grants, verifier),
            total_supply: 0,
            self_transfer: config.self_transfer,
            metadata: LazyOption::new(StorageKey::Metadata, Some(&metadata)),
        }
    }

    // ==================== ACCESS REGISTRY ====================

    #[handle_result]
    pub fn set_allowed(&mut self, account_id: AccountId, allowed: bool) -> Result<(), TokenError> {
        let cap = self
            .authority
            .ensure_privileged(&env::predecessor_account_id())?;
        self.allowlist.set_allowed(&cap, &account_id, allowed);

        TokenEvent::AllowlistUpdated(events::AllowlistUpdated {
            account_id: &account_id,
            allowed,
        })
        .emit();
        Ok(())
    }

    pub fn is_allowed(&self, account_id: AccountId) -> bool {
        self.allowlist.is_allowed(&account_id)
    }

    // ==================== MINT ====================

    /// Credit a public amount to an allowlisted account. Owner only.
    #[handle_result]
    pub fn mint(&mut self, account_id: AccountId, amount: U64) -> Result<(), TokenError> {
        let cap = self
            .authority
            .ensure_privileged(&env::predecessor_account_id())?;

        let balance = Minter {
            fhe: &mut self.fhe,
            ledger: &mut self.ledger,
            allowlist: &self.allowlist,
            total_supply: &mut self.total_supply,
        }
        .mint(&cap, &account_id, amount.0)?;

        TokenEvent::Mint(events::Mint {
            account_id: &account_id,
            amount,
            balance: balance.handle(),
            total_supply: U64(self.total_supply),
        })
        .emit();
        log!("Minted {} to {}", amount.0, account_id);
        Ok(())
    }

    // ==================== TRANSFER ====================

    /// Move an encrypted amount from the caller to `recipient_id`.
    ///
    /// Returns the handle of the executed amount: the requested amount if
    /// the caller could cover it, an encrypted zero otherwise. Both parties
    /// may decrypt it.
    #[handle_result]
    pub fn transfer(
        &mut self,
        recipient_id: AccountId,
        amount: EncryptedInput,
        proof: InputProof,
    ) -> Result<CipherHandle, TokenError> {
        let sender = env::predecessor_account_id();
        let plan = self.plan_transfer(&sender, &recipient_id, &amount, &proof)?;
        let executed = plan.commit(&mut self.fhe, &mut self.ledger);

        TokenEvent::Transfer(events::Transfer {
            sender_id: &plan.sender,
            recipient_id: &plan.recipient,
            executed: executed.handle(),
            sender_balance: plan.sender_after.handle(),
            recipient_balance: plan.recipient_after.handle(),
        })
        .emit();
        Ok(executed.handle())
    }

    /// Same checks and computation as `transfer`, nothing written. The
    /// executed amount is decryptable by `sender_id` for this call only;
    /// the returned handle does not resolve in a later transaction. Use
    /// `transfer_preview_decrypted` to read the amount.
    #[handle_result]
    pub fn transfer_preview(
        &self,
        sender_id: AccountId,
        recipient_id: AccountId,
        amount: EncryptedInput,
        proof: InputProof,
    ) -> Result<CipherHandle, TokenError> {
        let plan = self.plan_transfer(&sender_id, &recipient_id, &amount, &proof)?;
        Ok(plan.preview(&self.fhe).handle())
    }

    /// Preview a transfer from the caller and decrypt the executed amount
    /// in the same call. Must be a signed call; takes `&self`, so nothing
    /// is written.
    #[handle_result]
    pub fn transfer_preview_decrypted(
        &self,
        recipient_id: AccountId,
        amount: EncryptedInput,
        proof: InputProof,
    ) -> Result<U64, TokenError> {
        let sender = env::predecessor_account_id();
        let plan = self.plan_transfer(&sender, &recipient_id, &amount, &proof)?;
        let executed = plan.preview(&self.fhe);
        self.fhe.decrypt_u64(executed, &sender).map(U64)
    }

    pub fn balance_of(&self, account_id: AccountId) -> CipherHandle {
        self.ledger.balance_of(&account_id).handle()
    }

    pub fn total_supply(&self) -> U64 {
        U64(self.total_supply)
    }

    /// Accounts that ever held a balance entry
    pub fn account_count(&self) -> U64 {
        U64(self.ledger.account_count())
    }

    // ==================== DECRYPTION ====================

    /// Decrypt a handle for the caller. Requires a signed call; the
    /// caller must hold a grant on the handle.
    #[handle_result]
    pub fn user_decrypt(&self, handle: CipherHandle) -> Result<U64, TokenError> {
        let requester = env::predecessor_account_id();
        let value = Euint64::try_from(handle)?;
        self.fhe.decrypt_u64(value, &requester).map(U64)
    }

    pub fn has_access(&self, handle: CipherHandle, account_id: AccountId) -> bool {
        self.fhe.has_access(handle, &account_id)
    }

    // ==================== ADMIN OPERATIONS ====================

    #[handle_result]
    pub fn transfer_ownership(&mut self, new_owner: AccountId) -> Result<(), TokenError> {
        let cap = self
            .authority
            .ensure_privileged(&env::predecessor_account_id())?;
        let old_owner = self.authority.transfer(cap, new_owner.clone());

        TokenEvent::OwnershipTransferred(events::OwnershipTransferred {
            old_owner_id: &old_owner,
            new_owner_id: &new_owner,
        })
        .emit();
        log!("Ownership transferred from {} to {}", old_owner, new_owner);
        Ok(())
    }

    #[handle_result]
    pub fn set_self_transfer_policy(&mut self, policy: SelfTransferPolicy) -> Result<(), TokenError> {
        self.authority
            .ensure_privileged(&env::predecessor_account_id())?;
        self.self_transfer = policy;

        TokenEvent::SelfTransferPolicyUpdated(events::SelfTransferPolicyUpdated { policy }).emit();
        Ok(())
    }

    /// Rotate the ed25519 key whose signatures count as input proofs.
    /// Proofs issued under the previous key stop verifying immediately.
    #[handle_result]
    pub fn set_input_verifier(&mut self, public_key: String) -> Result<(), TokenError> {
        self.authority
            .ensure_privileged(&env::predecessor_account_id())?;
        let verifier = InputVerifier::from_hex(&public_key)?;
        self.fhe.set_verifier(verifier);

        TokenEvent::InputVerifierRotated(events::InputVerifierRotated {
            public_key: verifier.to_hex(),
        })
        .emit();
        Ok(())
    }

    // ==================== VIEW METHODS ====================

    pub fn owner(&self) -> AccountId {
        self.authority.owner().clone()
    }

    pub fn self_transfer_policy(&self) -> SelfTransferPolicy {
        self.self_transfer
    }

    pub fn input_verifier(&self) -> String {
        self.fhe.verifier().to_hex()
    }
}

impl ConfidentialToken {
    fn plan_transfer(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        amount: &EncryptedInput,
        proof: &InputProof,
    ) -> Result<TransferPlan, TokenError> {
        let contract = env::current_account_id();
        TransferEngine::new(
            &self.fhe,
            &self.ledger,
            &self.allowlist,
            self.self_transfer,
            &contract,
        )
        .plan(&TransferRequest {
            sender,
            recipient,
            amount,
            proof,
        })
    }
}

#[near_bindgen]
impl FungibleTokenMetadataProvider for ConfidentialToken {
    fn ft_metadata(&self) -> FungibleTokenMetadata {
        self.metadata
            .get()
            .unwrap_or_else(|| env::panic_str("metadata not initialized"))
    }
}
