//! Input Signing Service
//!
//! Signs the digest that binds a ciphertext to `(contract, caller)`. The
//! contract accepts a ciphertext only with a signature from the public key
//! it was configured with.

use confidential_token::input::{input_digest, open_u64, sign_input, InputProof};
use ed25519_dalek::SigningKey;
use near_sdk::AccountId;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Invalid verifier secret key: {0}")]
    InvalidSecretKey(String),
    #[error("Ciphertext is not a well-formed uint64 envelope")]
    InvalidEnvelope,
}

/// Proof issued for one ciphertext
#[derive(Debug, Clone)]
pub struct Attestation {
    pub request_id: String,
    pub proof: InputProof,
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

/// Input verifier signing key
pub struct InputSigner {
    signing_key: SigningKey,
}

impl InputSigner {
    pub fn new(secret_key_bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret_key_bytes),
        }
    }

    /// Load from a hex secret, or generate a throwaway key when none is
    /// given. The flag tells whether the key was generated.
    pub fn from_hex(secret_hex: Option<&str>) -> Result<(Self, bool), SignerError> {
        let Some(secret_hex) = secret_hex else {
            let key: [u8; 32] = rand::random();
            return Ok((Self::new(&key), true));
        };

        let secret_bytes: [u8; 32] = hex::decode(secret_hex.trim())
            .map_err(|e| SignerError::InvalidSecretKey(format!("invalid hex: {e}")))?
            .try_into()
            .map_err(|_| SignerError::InvalidSecretKey("must be 32 bytes".into()))?;

        Ok((Self::new(&secret_bytes), false))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Hex public key, as `set_input_verifier` and `TokenConfig` expect it
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Check the envelope and sign it for `caller` on `contract`
    pub fn attest(
        &self,
        contract: &AccountId,
        caller: &AccountId,
        ciphertext: &[u8],
    ) -> Result<Attestation, SignerError> {
        open_u64(ciphertext).map_err(|_| SignerError::InvalidEnvelope)?;

        let digest = input_digest(contract.as_str(), caller.as_str(), ciphertext);
        Ok(Attestation {
            request_id: uuid::Uuid::new_v4().to_string(),
            proof: sign_input(&self.signing_key, &digest),
            issued_at: chrono::Utc::now(),
        })
    }
}

/// Short, non-reversible tag for a ciphertext in logs
pub fn fingerprint(ciphertext: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"ctok:relayer:fingerprint:v1");
    hasher.update(ciphertext);
    let digest: [u8; 32] = hasher.finalize().into();
    hex::encode(&digest[..8])
}
