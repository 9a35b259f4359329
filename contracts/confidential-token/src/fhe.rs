//! # Encrypted values
//!
//! The ledger never sees a plaintext. It moves opaque 32-byte ciphertext
//! handles around and asks an [`FheOps`] backend to combine them. Handles
//! are typed at the Rust level ([`Euint64`], [`Ebool`]) so a comparison
//! result can only ever be consumed by [`FheOps::select`], never by a host
//! `if`.
//!
//! ## Handle layout
//! ```text
//! bytes 0..31  identifier (backend specific, e.g. a SHA-256 digest)
//! byte  31     value type tag (0 = bool, 5 = uint64)
//! ```
//! The all-zero handle is the uninitialized value. It stands for an
//! encrypted 0 and is decryptable by anyone; it is what an account that
//! never received funds reports as its balance.

use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use near_sdk::AccountId;
use std::fmt;

use crate::error::TokenError;
use crate::input::{EncryptedInput, InputProof};

pub const HANDLE_LEN: usize = 32;

/// Value type carried in the last byte of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    Bool = 0,
    Uint64 = 5,
}

impl ValueType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ValueType::Bool),
            5 => Some(ValueType::Uint64),
            _ => None,
        }
    }
}

/// Opaque reference to a ciphertext held by the FHE backend
#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[borsh(crate = "near_sdk::borsh")]
pub struct CipherHandle([u8; HANDLE_LEN]);

impl CipherHandle {
    pub const UNINITIALIZED: CipherHandle = CipherHandle([0u8; HANDLE_LEN]);

    pub fn from_bytes(bytes: [u8; HANDLE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.0
    }

    pub fn is_initialized(&self) -> bool {
        *self != Self::UNINITIALIZED
    }

    /// Type tag of an initialized handle
    pub fn value_type(&self) -> Option<ValueType> {
        if !self.is_initialized() {
            return None;
        }
        ValueType::from_tag(self.0[HANDLE_LEN - 1])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, TokenError> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| TokenError::UnknownCiphertext)?;
        let bytes: [u8; HANDLE_LEN] = bytes
            .try_into()
            .map_err(|_| TokenError::UnknownCiphertext)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for CipherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherHandle({})", self.to_hex())
    }
}

impl fmt::Display for CipherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for CipherHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CipherHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        CipherHandle::from_hex(&s).map_err(|_| de::Error::custom("expected 32-byte hex handle"))
    }
}

/// Encrypted unsigned 64-bit integer
#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, PartialEq, Eq, Debug)]
#[borsh(crate = "near_sdk::borsh")]
pub struct Euint64(CipherHandle);

impl Euint64 {
    pub fn uninitialized() -> Self {
        Self(CipherHandle::UNINITIALIZED)
    }

    pub fn handle(&self) -> CipherHandle {
        self.0
    }

    /// Wrap a handle produced by a backend. Backends are trusted to tag
    /// their own output correctly.
    pub(crate) fn from_backend(handle: CipherHandle) -> Self {
        Self(handle)
    }
}

impl TryFrom<CipherHandle> for Euint64 {
    type Error = TokenError;

    fn try_from(handle: CipherHandle) -> Result<Self, Self::Error> {
        match handle.value_type() {
            None if !handle.is_initialized() => Ok(Self(handle)),
            Some(ValueType::Uint64) => Ok(Self(handle)),
            _ => Err(TokenError::UnknownCiphertext),
        }
    }
}

/// Encrypted boolean. Only consumable by [`FheOps::select`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Ebool(CipherHandle);

impl Ebool {
    pub fn handle(&self) -> CipherHandle {
        self.0
    }

    pub(crate) fn from_backend(handle: CipherHandle) -> Self {
        Self(handle)
    }
}

/// Homomorphic operation kinds, as recorded in a backend's trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FheOp {
    TrivialEncrypt,
    VerifyInput,
    Add,
    Sub,
    Ge,
    Select,
}

impl FheOp {
    pub fn code(self) -> u8 {
        match self {
            FheOp::TrivialEncrypt => 0x01,
            FheOp::VerifyInput => 0x02,
            FheOp::Add => 0x10,
            FheOp::Sub => 0x11,
            FheOp::Ge => 0x20,
            FheOp::Select => 0x30,
        }
    }
}

/// Who an encrypted input must have been produced for
#[derive(Debug, Clone, Copy)]
pub struct InputBinding<'a> {
    pub contract: &'a AccountId,
    pub caller: &'a AccountId,
}

/// Homomorphic primitives over `u64`.
///
/// Computing operations take `&self`: their results are transient and only
/// become durable through [`FheOps::persist`]. This is what lets a preview
/// run the full computation against a read-only ledger.
pub trait FheOps {
    /// Encrypt a public value
    fn trivial_encrypt(&self, value: u64) -> Euint64;

    /// Validate caller-submitted ciphertext bytes and materialize a handle
    fn verify_input(
        &self,
        input: &EncryptedInput,
        proof: &InputProof,
        binding: InputBinding<'_>,
    ) -> Result<Euint64, TokenError>;

    /// `lhs + rhs mod 2^64`
    fn add(&self, lhs: Euint64, rhs: Euint64) -> Euint64;

    /// `lhs - rhs mod 2^64`
    fn sub(&self, lhs: Euint64, rhs: Euint64) -> Euint64;

    /// `lhs >= rhs`
    fn ge(&self, lhs: Euint64, rhs: Euint64) -> Ebool;

    /// `condition ? if_true : if_false`, without revealing `condition`
    fn select(&self, condition: Ebool, if_true: Euint64, if_false: Euint64) -> Euint64;

    /// Grant decryption rights that last only for the current call
    fn allow_transient(&self, handle: CipherHandle, account: &AccountId);

    /// Keep a computed ciphertext beyond the current call
    fn persist(&mut self, handle: CipherHandle);

    /// Grant lasting decryption rights
    fn allow(&mut self, handle: CipherHandle, account: &AccountId);

    fn has_access(&self, handle: CipherHandle, account: &AccountId) -> bool;
}

/// Authorized decryption. Access is decided by the grants attached when a
/// ciphertext was produced, never by the ledger. Callers holding a raw
/// handle go through `Euint64::try_from` first.
pub trait DecryptionOracle {
    fn decrypt_u64(&self, value: Euint64, requester: &AccountId) -> Result<u64, TokenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: u8) -> CipherHandle {
        let mut bytes = [7u8; HANDLE_LEN];
        bytes[HANDLE_LEN - 1] = tag;
        CipherHandle::from_bytes(bytes)
    }

    #[test]
    fn test_uninitialized_handle() {
        let handle = CipherHandle::UNINITIALIZED;
        assert!(!handle.is_initialized());
        assert_eq!(handle.value_type(), None);
        assert_eq!(Euint64::uninitialized().handle(), handle);
        assert!(Euint64::try_from(handle).is_ok());
    }

    #[test]
    fn test_typed_conversion() {
        assert!(Euint64::try_from(tagged(ValueType::Uint64.tag())).is_ok());
        assert_eq!(
            Euint64::try_from(tagged(ValueType::Bool.tag())),
            Err(TokenError::UnknownCiphertext)
        );
        assert_eq!(
            Euint64::try_from(tagged(0xee)),
            Err(TokenError::UnknownCiphertext)
        );
    }

    #[test]
    fn test_hex_serde() {
        let handle = tagged(5);
        let json = near_sdk::serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{}\"", handle.to_hex()));

        let back: CipherHandle = near_sdk::serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);

        let prefixed = format!("\"0x{}\"", handle.to_hex());
        let back: CipherHandle = near_sdk::serde_json::from_str(&prefixed).unwrap();
        assert_eq!(back, handle);

        assert!(near_sdk::serde_json::from_str::<CipherHandle>("\"abcd\"").is_err());
    }

    #[test]
    fn test_op_codes_are_distinct() {
        let ops = [
            FheOp::TrivialEncrypt,
            FheOp::VerifyInput,
            FheOp::Add,
            FheOp::Sub,
            FheOp::Ge,
            FheOp::Select,
        ];
        let mut codes: Vec<u8> = ops.iter().map(|op| op.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ops.len());
    }
}
