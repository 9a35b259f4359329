use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::collections::LookupMap;
use near_sdk::{AccountId, IntoStorageKey};

use crate::fhe::Euint64;

/// Encrypted balance per account. Sparse: an account without an entry holds
/// the uninitialized handle, which stands for 0. Entries are never removed.
#[derive(BorshDeserialize, BorshSerialize)]
#[borsh(crate = "near_sdk::borsh")]
pub struct BalanceLedger {
    balances: LookupMap<AccountId, Euint64>,
    accounts: u64,
}

impl BalanceLedger {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            balances: LookupMap::new(prefix),
            accounts: 0,
        }
    }

    pub fn balance_of(&self, account: &AccountId) -> Euint64 {
        self.balances
            .get(account)
            .unwrap_or_else(Euint64::uninitialized)
    }

    pub fn set(&mut self, account: &AccountId, balance: Euint64) {
        if self.balances.insert(account, &balance).is_none() {
            self.accounts += 1;
        }
    }

    /// Number of accounts that ever held an entry
    pub fn account_count(&self) -> u64 {
        self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::{CipherHandle, ValueType};
    use near_sdk::test_utils::{accounts, VMContextBuilder};
    use near_sdk::testing_env;

    fn handle(fill: u8) -> Euint64 {
        let mut bytes = [fill; 32];
        bytes[31] = ValueType::Uint64.tag();
        Euint64::try_from(CipherHandle::from_bytes(bytes)).unwrap()
    }

    #[test]
    fn test_absent_entry_is_uninitialized() {
        testing_env!(VMContextBuilder::new().build());
        let ledger = BalanceLedger::new(b"b".to_vec());
        assert_eq!(ledger.balance_of(&accounts(0)), Euint64::uninitialized());
        assert_eq!(ledger.account_count(), 0);
    }

    #[test]
    fn test_set_overwrites_and_counts_once() {
        testing_env!(VMContextBuilder::new().build());
        let mut ledger = BalanceLedger::new(b"b".to_vec());
        ledger.set(&accounts(0), handle(1));
        ledger.set(&accounts(0), handle(2));
        ledger.set(&accounts(1), handle(3));

        assert_eq!(ledger.balance_of(&accounts(0)), handle(2));
        assert_eq!(ledger.balance_of(&accounts(1)), handle(3));
        assert_eq!(ledger.account_count(), 2);
    }
}
