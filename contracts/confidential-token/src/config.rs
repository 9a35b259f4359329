use near_contract_standards::fungible_token::metadata::{FungibleTokenMetadata, FT_METADATA_SPEC};
use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::serde::{Deserialize, Serialize};
use near_sdk::AccountId;

/// What `transfer` does when sender and recipient are the same account
#[derive(
    BorshDeserialize, BorshSerialize, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq,
)]
#[borsh(crate = "near_sdk::borsh")]
#[serde(crate = "near_sdk::serde", rename_all = "snake_case")]
pub enum SelfTransferPolicy {
    /// Fail with `InvalidRecipient` before any other check
    #[default]
    Reject,
    /// Run the full computation; the balance value comes out unchanged
    NoOp,
}

/// Arguments of `new`
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(crate = "near_sdk::serde")]
pub struct TokenConfig {
    /// Holder of the privileged role
    pub owner_id: AccountId,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Hex ed25519 public key of the input verifier
    pub input_verifier: String,
    #[serde(default)]
    pub self_transfer: SelfTransferPolicy,
}

fn default_name() -> String {
    "Confidential USD".to_string()
}

fn default_symbol() -> String {
    "cUSD".to_string()
}

fn default_decimals() -> u8 {
    6
}

impl TokenConfig {
    pub fn new(owner_id: AccountId, input_verifier: impl Into<String>) -> Self {
        Self {
            owner_id,
            name: default_name(),
            symbol: default_symbol(),
            decimals: default_decimals(),
            input_verifier: input_verifier.into(),
            self_transfer: SelfTransferPolicy::default(),
        }
    }

    pub fn metadata(&self) -> FungibleTokenMetadata {
        FungibleTokenMetadata {
            spec: FT_METADATA_SPEC.to_string(),
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            icon: None,
            reference: None,
            reference_hash: None,
            decimals: self.decimals,
        }
    }
}
