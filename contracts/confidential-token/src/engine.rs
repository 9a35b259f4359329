//! Confidential transfer and mint
//!
//! A transfer is planned in two steps. [`TransferEngine::plan`] checks the
//! preconditions and runs the homomorphic computation against read-only
//! state. The resulting [`TransferPlan`] is then either committed (ledger
//! writes, persistence, grants) or used as a preview (one transient grant,
//! nothing written). Both paths execute exactly the same operations.
//!
//! ```text
//! sufficient     = ge(sender_balance, requested)
//! executed       = select(sufficient, requested, trivial_encrypt(0))
//! sender_after   = sub(sender_balance, executed)
//! recipient_after = add(recipient_balance, executed)
//! ```
//!
//! Nothing on the host side ever branches on `sufficient`.

use near_sdk::AccountId;

use crate::access::{Allowlist, Privileged};
use crate::config::SelfTransferPolicy;
use crate::error::TokenError;
use crate::fhe::{Euint64, FheOps, InputBinding};
use crate::input::{EncryptedInput, InputProof};
use crate::ledger::BalanceLedger;

pub struct TransferRequest<'a> {
    pub sender: &'a AccountId,
    pub recipient: &'a AccountId,
    pub amount: &'a EncryptedInput,
    pub proof: &'a InputProof,
}

pub struct TransferEngine<'a, F: FheOps> {
    fhe: &'a F,
    ledger: &'a BalanceLedger,
    allowlist: &'a Allowlist,
    policy: SelfTransferPolicy,
    contract: &'a AccountId,
}

/// Computed but not yet applied transfer
#[derive(Debug)]
pub struct TransferPlan {
    pub sender: AccountId,
    pub recipient: AccountId,
    pub sender_after: Euint64,
    pub recipient_after: Euint64,
    pub executed: Euint64,
}

impl<'a, F: FheOps> TransferEngine<'a, F> {
    pub fn new(
        fhe: &'a F,
        ledger: &'a BalanceLedger,
        allowlist: &'a Allowlist,
        policy: SelfTransferPolicy,
        contract: &'a AccountId,
    ) -> Self {
        Self {
            fhe,
            ledger,
            allowlist,
            policy,
            contract,
        }
    }

    pub fn plan(&self, request: &TransferRequest<'_>) -> Result<TransferPlan, TokenError> {
        let self_transfer = request.sender == request.recipient;
        if self_transfer && self.policy == SelfTransferPolicy::Reject {
            return Err(TokenError::InvalidRecipient);
        }
        if !self.allowlist.is_allowed(request.sender) || !self.allowlist.is_allowed(request.recipient)
        {
            return Err(TokenError::NotAllowed);
        }

        let requested = self.fhe.verify_input(
            request.amount,
            request.proof,
            InputBinding {
                contract: self.contract,
                caller: request.sender,
            },
        )?;

        let sender_balance = self.ledger.balance_of(request.sender);
        let sufficient = self.fhe.ge(sender_balance, requested);
        let zero = self.fhe.trivial_encrypt(0);
        let executed = self.fhe.select(sufficient, requested, zero);
        let sender_after = self.fhe.sub(sender_balance, executed);

        // the same entry, so credit on top of the debited value
        let recipient_base = if self_transfer {
            sender_after
        } else {
            self.ledger.balance_of(request.recipient)
        };
        let recipient_after = self.fhe.add(recipient_base, executed);

        Ok(TransferPlan {
            sender: request.sender.clone(),
            recipient: request.recipient.clone(),
            sender_after,
            recipient_after,
            executed,
        })
    }
}

impl TransferPlan {
    /// Apply the plan and return the executed amount
    pub fn commit<F: FheOps>(&self, fhe: &mut F, ledger: &mut BalanceLedger) -> Euint64 {
        ledger.set(&self.sender, self.sender_after);
        ledger.set(&self.recipient, self.recipient_after);

        fhe.persist(self.sender_after.handle());
        fhe.persist(self.recipient_after.handle());
        fhe.persist(self.executed.handle());

        fhe.allow(self.sender_after.handle(), &self.sender);
        fhe.allow(self.recipient_after.handle(), &self.recipient);
        fhe.allow(self.executed.handle(), &self.sender);
        fhe.allow(self.executed.handle(), &self.recipient);

        self.executed
    }

    /// Expose the executed amount to the sender for the current call only
    pub fn preview<F: FheOps>(&self, fhe: &F) -> Euint64 {
        fhe.allow_transient(self.executed.handle(), &self.sender);
        self.executed
    }
}

/// Supply issuance. Mint amounts are public, so the supply is tracked in
/// the clear and bounds every balance below `u64::MAX`.
pub struct Minter<'a, F: FheOps> {
    pub fhe: &'a mut F,
    pub ledger: &'a mut BalanceLedger,
    pub allowlist: &'a Allowlist,
    pub total_supply: &'a mut u64,
}

impl<F: FheOps> Minter<'_, F> {
    /// Credit `amount` to `account` and return its new balance
    pub fn mint(
        self,
        _cap: &Privileged,
        account: &AccountId,
        amount: u64,
    ) -> Result<Euint64, TokenError> {
        if !self.allowlist.is_allowed(account) {
            return Err(TokenError::NotAllowed);
        }
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;

        let current = self.ledger.balance_of(account);
        let credit = self.fhe.trivial_encrypt(amount);
        let balance = self.fhe.add(current, credit);

        self.fhe.persist(balance.handle());
        self.fhe.allow(balance.handle(), account);
        self.ledger.set(account, balance);
        *self.total_supply = new_supply;

        Ok(balance)
    }
}
