//! Allowlist and the privileged role
//!
//! Privilege is a capability, not a flag checked ad hoc: [`Authority`]
//! hands out a [`Privileged`] token only to its current holder, and every
//! privileged mutation takes one.

use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::collections::LookupSet;
use near_sdk::{AccountId, IntoStorageKey};

use crate::error::TokenError;

/// Proof that the caller holds the privileged role for the current call
#[derive(Debug)]
pub struct Privileged {
    _private: (),
}

#[derive(BorshDeserialize, BorshSerialize)]
#[borsh(crate = "near_sdk::borsh")]
pub struct Authority {
    owner: AccountId,
}

impl Authority {
    pub fn new(owner: AccountId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn ensure_privileged(&self, caller: &AccountId) -> Result<Privileged, TokenError> {
        if caller != &self.owner {
            return Err(TokenError::Unauthorized);
        }
        Ok(Privileged { _private: () })
    }

    /// Hand the role to `new_owner`, returning the previous holder
    pub fn transfer(&mut self, _cap: Privileged, new_owner: AccountId) -> AccountId {
        std::mem::replace(&mut self.owner, new_owner)
    }
}

/// Accounts permitted to hold and move the token. Absent means not allowed.
#[derive(BorshDeserialize, BorshSerialize)]
#[borsh(crate = "near_sdk::borsh")]
pub struct Allowlist {
    members: LookupSet<AccountId>,
}

impl Allowlist {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            members: LookupSet::new(prefix),
        }
    }

    pub fn is_allowed(&self, account: &AccountId) -> bool {
        self.members.contains(account)
    }

    /// Returns whether the entry changed
    pub fn set_allowed(&mut self, _cap: &Privileged, account: &AccountId, allowed: bool) -> bool {
        if allowed {
            self.members.insert(account)
        } else {
            self.members.remove(account)
        }
    }
}
