//! NEP-297 event log lines
//!
//! Events carry account ids and ciphertext handles, never plaintext
//! amounts. The one exception is `mint`, whose amount is public anyway.

use near_sdk::json_types::U64;
use near_sdk::serde::Serialize;
use near_sdk::serde_json::{self, json, Value};
use near_sdk::{env, AccountId};

use crate::config::SelfTransferPolicy;
use crate::fhe::CipherHandle;

pub const EVENT_STANDARD: &str = "ctok";
pub const EVENT_VERSION: &str = "1.0.0";

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct AllowlistUpdated<'a> {
    pub account_id: &'a AccountId,
    pub allowed: bool,
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct Mint<'a> {
    pub account_id: &'a AccountId,
    pub amount: U64,
    pub balance: CipherHandle,
    pub total_supply: U64,
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct Transfer<'a> {
    pub sender_id: &'a AccountId,
    pub recipient_id: &'a AccountId,
    pub executed: CipherHandle,
    pub sender_balance: CipherHandle,
    pub recipient_balance: CipherHandle,
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct OwnershipTransferred<'a> {
    pub old_owner_id: &'a AccountId,
    pub new_owner_id: &'a AccountId,
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct SelfTransferPolicyUpdated {
    pub policy: SelfTransferPolicy,
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct InputVerifierRotated {
    pub public_key: String,
}

#[derive(Debug)]
pub enum TokenEvent<'a> {
    AllowlistUpdated(AllowlistUpdated<'a>),
    Mint(Mint<'a>),
    Transfer(Transfer<'a>),
    OwnershipTransferred(OwnershipTransferred<'a>),
    SelfTransferPolicyUpdated(SelfTransferPolicyUpdated),
    InputVerifierRotated(InputVerifierRotated),
}

impl TokenEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TokenEvent::AllowlistUpdated(_) => "allowlist_updated",
            TokenEvent::Mint(_) => "mint",
            TokenEvent::Transfer(_) => "transfer",
            TokenEvent::OwnershipTransferred(_) => "ownership_transferred",
            TokenEvent::SelfTransferPolicyUpdated(_) => "self_transfer_policy_updated",
            TokenEvent::InputVerifierRotated(_) => "input_verifier_rotated",
        }
    }

    fn data(&self) -> Result<Value, serde_json::Error> {
        match self {
            TokenEvent::AllowlistUpdated(data) => serde_json::to_value(data),
            TokenEvent::Mint(data) => serde_json::to_value(data),
            TokenEvent::Transfer(data) => serde_json::to_value(data),
            TokenEvent::OwnershipTransferred(data) => serde_json::to_value(data),
            TokenEvent::SelfTransferPolicyUpdated(data) => serde_json::to_value(data),
            TokenEvent::InputVerifierRotated(data) => serde_json::to_value(data),
        }
    }

    pub fn to_json(&self) -> String {
        // event payloads are plain structs of strings and numbers
        let data = self.data().unwrap_or(Value::Null);
        json!({
            "standard": EVENT_STANDARD,
            "version": EVENT_VERSION,
            "event": self.name(),
            "data": [data],
        })
        .to_string()
    }

    pub fn emit(&self) {
        env::log_str(&format!("EVENT_JSON:{}", self.to_json()));
    }
}
