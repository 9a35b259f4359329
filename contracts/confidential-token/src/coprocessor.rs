//! Development coprocessor
//!
//! An in-contract [`FheOps`] backend in the style of an fhEVM "mock mode":
//! every handle maps to a cleartext [`Plaintext`] held in contract storage.
//! It gives the ledger a real, deterministic backend to run against in
//! tests and on testnet. It provides **no confidentiality**: anyone reading
//! the contract state sees the values.
//!
//! Results of computing operations land in a per-call scratch area (never
//! serialized) and only move to storage through [`FheOps::persist`]. The
//! same goes for grants: `allow_transient` lives in scratch, `allow` in
//! storage.

use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::collections::{LookupMap, LookupSet};
use near_sdk::{env, AccountId, IntoStorageKey};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::TokenError;
use crate::fhe::{
    CipherHandle, DecryptionOracle, Ebool, Euint64, FheOp, FheOps, InputBinding, ValueType,
};
use crate::input::{input_digest, open_u64, EncryptedInput, InputProof, InputVerifier};

const HANDLE_DOMAIN: &[u8] = b"ctok:handle:v1";

/// Cleartext behind a development handle
#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, PartialEq, Eq, Debug)]
#[borsh(crate = "near_sdk::borsh")]
pub enum Plaintext {
    Bool(bool),
    Uint64(u64),
}

#[derive(BorshDeserialize, BorshSerialize)]
#[borsh(crate = "near_sdk::borsh")]
pub struct Grant {
    handle: CipherHandle,
    account: AccountId,
}

#[derive(Default)]
struct Scratch {
    values: HashMap<CipherHandle, Plaintext>,
    grants: HashSet<(CipherHandle, AccountId)>,
    nonce: u64,
    trace: Vec<FheOp>,
}

#[derive(BorshDeserialize, BorshSerialize)]
#[borsh(crate = "near_sdk::borsh")]
pub struct Coprocessor {
    ciphertexts: LookupMap<CipherHandle, Plaintext>,
    grants: LookupSet<Grant>,
    verifier: InputVerifier,
    #[borsh(skip)]
    scratch: RefCell<Scratch>,
}

impl Coprocessor {
    pub fn new<C, G>(ciphertexts: C, grants: G, verifier: InputVerifier) -> Self
    where
        C: IntoStorageKey,
        G: IntoStorageKey,
    {
        Self {
            ciphertexts: LookupMap::new(ciphertexts),
            grants: LookupSet::new(grants),
            verifier,
            scratch: RefCell::new(Scratch::default()),
        }
    }

    pub fn verifier(&self) -> &InputVerifier {
        &self.verifier
    }

    pub fn set_verifier(&mut self, verifier: InputVerifier) {
        self.verifier = verifier;
    }

    /// Operations executed since the last call, in order
    pub fn take_trace(&self) -> Vec<FheOp> {
        std::mem::take(&mut self.scratch.borrow_mut().trace)
    }

    fn lookup(&self, handle: CipherHandle) -> Option<Plaintext> {
        if !handle.is_initialized() {
            return Some(Plaintext::Uint64(0));
        }
        if let Some(value) = self.scratch.borrow().values.get(&handle) {
            return Some(*value);
        }
        self.ciphertexts.get(&handle)
    }

    fn load_u64(&self, value: Euint64) -> u64 {
        match self.lookup(value.handle()) {
            Some(Plaintext::Uint64(v)) => v,
            _ => env::panic_str(TokenError::UnknownCiphertext.as_str()),
        }
    }

    fn load_bool(&self, value: Ebool) -> bool {
        match self.lookup(value.handle()) {
            Some(Plaintext::Bool(b)) => b,
            _ => env::panic_str(TokenError::UnknownCiphertext.as_str()),
        }
    }

    fn derive_handle(&self, op: FheOp, operands: &[&[u8]], value_type: ValueType) -> CipherHandle {
        let nonce = {
            let mut scratch = self.scratch.borrow_mut();
            scratch.nonce += 1;
            scratch.nonce
        };
        let contract = env::current_account_id();

        let mut hasher = Sha256::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update((contract.as_str().len() as u32).to_le_bytes());
        hasher.update(contract.as_str().as_bytes());
        hasher.update(env::random_seed());
        hasher.update(env::block_height().to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        hasher.update([op.code()]);
        for operand in operands {
            hasher.update(operand);
        }
        let mut bytes: [u8; 32] = hasher.finalize().into();
        bytes[31] = value_type.tag();
        CipherHandle::from_bytes(bytes)
    }

    fn produce(&self, op: FheOp, operands: &[&[u8]], value: Plaintext) -> CipherHandle {
        let value_type = match value {
            Plaintext::Bool(_) => ValueType::Bool,
            Plaintext::Uint64(_) => ValueType::Uint64,
        };
        let handle = self.derive_handle(op, operands, value_type);
        let mut scratch = self.scratch.borrow_mut();
        scratch.values.insert(handle, value);
        scratch.trace.push(op);
        handle
    }
}

impl FheOps for Coprocessor {
    fn trivial_encrypt(&self, value: u64) -> Euint64 {
        let handle = self.produce(
            FheOp::TrivialEncrypt,
            &[&value.to_le_bytes()],
            Plaintext::Uint64(value),
        );
        Euint64::from_backend(handle)
    }

    fn verify_input(
        &self,
        input: &EncryptedInput,
        proof: &InputProof,
        binding: InputBinding<'_>,
    ) -> Result<Euint64, TokenError> {
        let digest = input_digest(
            binding.contract.as_str(),
            binding.caller.as_str(),
            input.ciphertext(),
        );
        self.verifier.verify(&digest, proof)?;
        let value = open_u64(input.ciphertext())?;
        let handle = self.produce(FheOp::VerifyInput, &[&digest], Plaintext::Uint64(value));
        Ok(Euint64::from_backend(handle))
    }

    fn add(&self, lhs: Euint64, rhs: Euint64) -> Euint64 {
        let sum = self.load_u64(lhs).wrapping_add(self.load_u64(rhs));
        let handle = self.produce(
            FheOp::Add,
            &[lhs.handle().as_bytes(), rhs.handle().as_bytes()],
            Plaintext::Uint64(sum),
        );
        Euint64::from_backend(handle)
    }

    fn sub(&self, lhs: Euint64, rhs: Euint64) -> Euint64 {
        let diff = self.load_u64(lhs).wrapping_sub(self.load_u64(rhs));
        let handle = self.produce(
            FheOp::Sub,
            &[lhs.handle().as_bytes(), rhs.handle().as_bytes()],
            Plaintext::Uint64(diff),
        );
        Euint64::from_backend(handle)
    }

    fn ge(&self, lhs: Euint64, rhs: Euint64) -> Ebool {
        let result = self.load_u64(lhs) >= self.load_u64(rhs);
        let handle = self.produce(
            FheOp::Ge,
            &[lhs.handle().as_bytes(), rhs.handle().as_bytes()],
            Plaintext::Bool(result),
        );
        Ebool::from_backend(handle)
    }

    fn select(&self, condition: Ebool, if_true: Euint64, if_false: Euint64) -> Euint64 {
        // both arms are loaded whatever the condition
        let a = self.load_u64(if_true);
        let b = self.load_u64(if_false);
        let picked = if self.load_bool(condition) { a } else { b };
        let handle = self.produce(
            FheOp::Select,
            &[
                condition.handle().as_bytes(),
                if_true.handle().as_bytes(),
                if_false.handle().as_bytes(),
            ],
            Plaintext::Uint64(picked),
        );
        Euint64::from_backend(handle)
    }

    fn allow_transient(&self, handle: CipherHandle, account: &AccountId) {
        self.scratch
            .borrow_mut()
            .grants
            .insert((handle, account.clone()));
    }

    fn persist(&mut self, handle: CipherHandle) {
        if !handle.is_initialized() {
            return;
        }
        let value = self.scratch.borrow_mut().values.remove(&handle);
        if let Some(value) = value {
            self.ciphertexts.insert(&handle, &value);
        }
    }

    fn allow(&mut self, handle: CipherHandle, account: &AccountId) {
        self.grants.insert(&Grant {
            handle,
            account: account.clone(),
        });
    }

    fn has_access(&self, handle: CipherHandle, account: &AccountId) -> bool {
        if !handle.is_initialized() {
            return true;
        }
        if self
            .scratch
            .borrow()
            .grants
            .contains(&(handle, account.clone()))
        {
            return true;
        }
        self.grants.contains(&Grant {
            handle,
            account: account.clone(),
        })
    }
}

impl DecryptionOracle for Coprocessor {
    fn decrypt_u64(&self, value: Euint64, requester: &AccountId) -> Result<u64, TokenError> {
        let handle = value.handle();
        let value = match self.lookup(handle) {
            Some(Plaintext::Uint64(v)) => v,
            _ => return Err(TokenError::UnknownCiphertext),
        };
        if !self.has_access(handle, requester) {
            return Err(TokenError::Unauthorized);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{sign_input, InputBuilder};
    use ed25519_dalek::SigningKey;
    use near_sdk::test_utils::{accounts, VMContextBuilder};
    use near_sdk::testing_env;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn setup() -> Coprocessor {
        let mut builder = VMContextBuilder::new();
        builder.current_account_id("ctok.near".parse().unwrap());
        testing_env!(builder.build());
        let verifier = InputVerifier::from_bytes(signing_key().verifying_key().to_bytes()).unwrap();
        Coprocessor::new(b"c".to_vec(), b"g".to_vec(), verifier)
    }

    fn owner_sees(fhe: &Coprocessor, value: Euint64) -> u64 {
        let owner = accounts(0);
        fhe.allow_transient(value.handle(), &owner);
        fhe.decrypt_u64(value, &owner).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        let fhe = setup();
        let a = fhe.trivial_encrypt(700);
        let b = fhe.trivial_encrypt(200);

        assert_eq!(owner_sees(&fhe, fhe.add(a, b)), 900);
        assert_eq!(owner_sees(&fhe, fhe.sub(a, b)), 500);
        // wraps like the encrypted domain does
        assert_eq!(owner_sees(&fhe, fhe.sub(b, a)), u64::MAX - 499);

        let zero = fhe.trivial_encrypt(0);
        assert_eq!(owner_sees(&fhe, fhe.select(fhe.ge(a, b), a, zero)), 700);
        assert_eq!(owner_sees(&fhe, fhe.select(fhe.ge(b, a), b, zero)), 0);
        assert_eq!(owner_sees(&fhe, fhe.select(fhe.ge(a, a), a, zero)), 700);
    }

    #[test]
    fn test_equal_values_get_distinct_handles() {
        let fhe = setup();
        let a = fhe.trivial_encrypt(5);
        let b = fhe.trivial_encrypt(5);
        assert_ne!(a.handle(), b.handle());
        assert_eq!(a.handle().value_type(), Some(ValueType::Uint64));
        assert_eq!(
            fhe.ge(a, b).handle().value_type(),
            Some(ValueType::Bool)
        );
    }

    #[test]
    fn test_uninitialized_reads_as_zero() {
        let fhe = setup();
        let none = Euint64::uninitialized();
        assert_eq!(fhe.decrypt_u64(none, &accounts(3)), Ok(0));
        assert_eq!(owner_sees(&fhe, fhe.add(none, fhe.trivial_encrypt(3))), 3);
    }

    #[test]
    fn test_verify_input() {
        let fhe = setup();
        let contract: AccountId = "ctok.near".parse().unwrap();
        let alice = accounts(0);
        let bob = accounts(1);
        let built = InputBuilder::new(contract.as_str(), alice.as_str()).encrypt_u64(250);
        let proof = sign_input(&signing_key(), &built.digest);

        let binding = InputBinding {
            contract: &contract,
            caller: &alice,
        };
        let amount = fhe.verify_input(&built.input, &proof, binding).unwrap();
        assert_eq!(owner_sees(&fhe, amount), 250);

        let wrong_caller = InputBinding {
            contract: &contract,
            caller: &bob,
        };
        assert_eq!(
            fhe.verify_input(&built.input, &proof, wrong_caller),
            Err(TokenError::InvalidProof)
        );

        let mut tampered = built.input.clone();
        tampered.ciphertext.0[2] ^= 1;
        assert_eq!(
            fhe.verify_input(&tampered, &proof, binding),
            Err(TokenError::InvalidProof)
        );
    }

    #[test]
    fn test_signed_garbage_is_rejected() {
        let fhe = setup();
        let contract: AccountId = "ctok.near".parse().unwrap();
        let alice = accounts(0);
        let garbage = EncryptedInput::new(vec![1, 2, 3]);
        let digest = input_digest(contract.as_str(), alice.as_str(), garbage.ciphertext());
        let proof = sign_input(&signing_key(), &digest);
        let binding = InputBinding {
            contract: &contract,
            caller: &alice,
        };
        assert_eq!(
            fhe.verify_input(&garbage, &proof, binding),
            Err(TokenError::InvalidProof)
        );
    }

    #[test]
    fn test_acl() {
        let mut fhe = setup();
        let alice = accounts(0);
        let eve = accounts(4);
        let value = fhe.trivial_encrypt(42);

        assert_eq!(
            fhe.decrypt_u64(value, &alice),
            Err(TokenError::Unauthorized)
        );

        fhe.persist(value.handle());
        fhe.allow(value.handle(), &alice);
        assert!(fhe.has_access(value.handle(), &alice));
        assert_eq!(fhe.decrypt_u64(value, &alice), Ok(42));
        assert_eq!(
            fhe.decrypt_u64(value, &eve),
            Err(TokenError::Unauthorized)
        );
    }

    #[test]
    fn test_unknown_handle() {
        let fhe = setup();
        let mut bytes = [1u8; 32];
        bytes[31] = ValueType::Uint64.tag();
        let never_stored = Euint64::try_from(CipherHandle::from_bytes(bytes)).unwrap();
        assert_eq!(
            fhe.decrypt_u64(never_stored, &accounts(0)),
            Err(TokenError::UnknownCiphertext)
        );

        // a comparison result is not a uint64
        let flag = fhe.ge(fhe.trivial_encrypt(1), fhe.trivial_encrypt(0));
        assert_eq!(
            Euint64::try_from(flag.handle()),
            Err(TokenError::UnknownCiphertext)
        );
    }

    #[test]
    fn test_persist_survives_scratch_reset() {
        let mut fhe = setup();
        let kept = fhe.trivial_encrypt(11);
        let dropped = fhe.trivial_encrypt(12);
        fhe.persist(kept.handle());
        fhe.allow(kept.handle(), &accounts(0));
        fhe.allow(dropped.handle(), &accounts(0));

        // what a fresh call sees after state is reloaded
        fhe.scratch = RefCell::new(Scratch::default());

        assert_eq!(fhe.decrypt_u64(kept, &accounts(0)), Ok(11));
        assert_eq!(
            fhe.decrypt_u64(dropped, &accounts(0)),
            Err(TokenError::UnknownCiphertext)
        );
    }

    #[test]
    fn test_trace() {
        let fhe = setup();
        let a = fhe.trivial_encrypt(1);
        let b = fhe.add(a, a);
        fhe.ge(b, a);
        assert_eq!(
            fhe.take_trace(),
            vec![FheOp::TrivialEncrypt, FheOp::Add, FheOp::Ge]
        );
        assert!(fhe.take_trace().is_empty());
    }
}
