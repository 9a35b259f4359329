//! Shared fixtures for unit tests

use ed25519_dalek::SigningKey;
use near_sdk::AccountId;

use crate::input::{sign_input, EncryptedInput, InputBuilder, InputProof, InputVerifier};

pub const CONTRACT: &str = "ctok.near";

pub fn contract_id() -> AccountId {
    CONTRACT.parse().unwrap()
}

pub fn verifier_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

pub fn verifier() -> InputVerifier {
    InputVerifier::from_bytes(verifier_key().verifying_key().to_bytes()).unwrap()
}

pub fn verifier_hex() -> String {
    hex::encode(verifier_key().verifying_key().to_bytes())
}

/// Encrypt `value` for `caller` against this contract and attest it
pub fn signed_amount(caller: &AccountId, value: u64) -> (EncryptedInput, InputProof) {
    signed_amount_with(&verifier_key(), CONTRACT, caller, value)
}

pub fn signed_amount_with(
    key: &SigningKey,
    contract: &str,
    caller: &AccountId,
    value: u64,
) -> (EncryptedInput, InputProof) {
    let built = InputBuilder::new(contract, caller.as_str()).encrypt_u64(value);
    let proof = sign_input(key, &built.digest);
    (built.input, proof)
}
