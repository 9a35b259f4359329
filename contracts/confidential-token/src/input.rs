//! Encrypted inputs and their proofs
//!
//! A caller never hands the contract a bare handle. It submits ciphertext
//! bytes plus a proof from the input verifier that the bytes are well formed
//! and were produced for *this* contract and *this* caller. Replaying the
//! same bytes from another account or against another deployment fails.
//!
//! The envelope format here is the development scheme understood by
//! [`crate::coprocessor::Coprocessor`]:
//!
//! ```text
//! [version = 1][type tag = 5][u64 little endian]   (10 bytes)
//! ```

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::json_types::Base64VecU8;
use near_sdk::serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TokenError;
use crate::fhe::ValueType;

pub const ENVELOPE_VERSION: u8 = 1;
pub const ENVELOPE_LEN: usize = 10;
pub const SIGNATURE_LEN: usize = 64;

const INPUT_DOMAIN: &[u8] = b"ctok:input:v1";

/// Ciphertext bytes as submitted by a caller
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde")]
pub struct EncryptedInput {
    pub ciphertext: Base64VecU8,
}

impl EncryptedInput {
    pub fn new(ciphertext: Vec<u8>) -> Self {
        Self {
            ciphertext: Base64VecU8::from(ciphertext),
        }
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext.0
    }
}

/// Input verifier signature over [`input_digest`]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(crate = "near_sdk::serde")]
pub struct InputProof {
    pub signature: Base64VecU8,
}

impl InputProof {
    pub fn new(signature: Vec<u8>) -> Self {
        Self {
            signature: Base64VecU8::from(signature),
        }
    }
}

/// Digest binding a ciphertext to a contract and a caller.
///
/// Account ids are length-prefixed so `("ab", "c")` and `("a", "bc")`
/// never collide.
pub fn input_digest(contract: &str, caller: &str, ciphertext: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(INPUT_DOMAIN);
    hasher.update((contract.len() as u32).to_le_bytes());
    hasher.update(contract.as_bytes());
    hasher.update((caller.len() as u32).to_le_bytes());
    hasher.update(caller.as_bytes());
    hasher.update(ciphertext);
    hasher.finalize().into()
}

/// Wrap a value in the development envelope
pub fn seal_u64(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVELOPE_LEN);
    out.push(ENVELOPE_VERSION);
    out.push(ValueType::Uint64.tag());
    out.extend_from_slice(&value.to_le_bytes());
    out
}

/// Open a development envelope. Anything but a well-formed uint64 envelope
/// is an invalid input.
pub fn open_u64(ciphertext: &[u8]) -> Result<u64, TokenError> {
    if ciphertext.len() != ENVELOPE_LEN
        || ciphertext[0] != ENVELOPE_VERSION
        || ciphertext[1] != ValueType::Uint64.tag()
    {
        return Err(TokenError::InvalidProof);
    }
    let mut le = [0u8; 8];
    le.copy_from_slice(&ciphertext[2..]);
    Ok(u64::from_le_bytes(le))
}

/// ed25519 public key whose signatures the contract accepts as input proofs
#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, PartialEq, Eq, Debug)]
#[borsh(crate = "near_sdk::borsh")]
pub struct InputVerifier {
    public_key: [u8; 32],
}

impl InputVerifier {
    pub fn from_bytes(public_key: [u8; 32]) -> Result<Self, TokenError> {
        VerifyingKey::from_bytes(&public_key).map_err(|_| TokenError::InvalidConfig)?;
        Ok(Self { public_key })
    }

    pub fn from_hex(public_key: &str) -> Result<Self, TokenError> {
        let bytes: [u8; 32] = hex::decode(public_key)
            .map_err(|_| TokenError::InvalidConfig)?
            .try_into()
            .map_err(|_| TokenError::InvalidConfig)?;
        Self::from_bytes(bytes)
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn verify(&self, digest: &[u8; 32], proof: &InputProof) -> Result<(), TokenError> {
        let key = VerifyingKey::from_bytes(&self.public_key).map_err(|_| TokenError::InvalidProof)?;
        let signature: [u8; SIGNATURE_LEN] = proof
            .signature
            .0
            .as_slice()
            .try_into()
            .map_err(|_| TokenError::InvalidProof)?;
        key.verify_strict(digest, &Signature::from_bytes(&signature))
            .map_err(|_| TokenError::InvalidProof)
    }
}

/// Sign an input digest. Used by the relayer and by tests.
pub fn sign_input(signing_key: &SigningKey, digest: &[u8; 32]) -> InputProof {
    InputProof::new(signing_key.sign(digest).to_bytes().to_vec())
}

/// An envelope together with the digest a verifier has to sign for it
#[derive(Clone, Debug)]
pub struct BuiltInput {
    pub input: EncryptedInput,
    pub digest: [u8; 32],
}

/// Client-side construction of encrypted inputs
///
/// ```ignore
/// let built = InputBuilder::new("ctok.near", "alice.near").encrypt_u64(200_000);
/// let proof = relayer.attest(&built)?;
/// contract.transfer(bob, built.input, proof);
/// ```
pub struct InputBuilder {
    contract: String,
    caller: String,
}

impl InputBuilder {
    pub fn new(contract: impl Into<String>, caller: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            caller: caller.into(),
        }
    }

    pub fn encrypt_u64(&self, value: u64) -> BuiltInput {
        let ciphertext = seal_u64(value);
        let digest = input_digest(&self.contract, &self.caller, &ciphertext);
        BuiltInput {
            input: EncryptedInput::new(ciphertext),
            digest,
        }
    }
}
