//! Contract errors
//!
//! Every variant aborts the call before any storage write. Insufficient
//! balance is deliberately absent: a short transfer succeeds with an
//! encrypted zero as its executed amount.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Caller does not hold the privileged role
    Unauthorized,
    /// Sender, recipient or mint target is not on the allowlist
    NotAllowed,
    /// Self-transfer under the `Reject` policy
    InvalidRecipient,
    /// Ciphertext or input proof failed validation
    InvalidProof,
    /// Mint would push the total supply past `u64::MAX`
    SupplyOverflow,
    /// Handle has no stored value of the requested type
    UnknownCiphertext,
    /// Malformed configuration value (e.g. verifier key)
    InvalidConfig,
}

impl TokenError {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::Unauthorized => "Unauthorized: caller lacks the privileged role",
            TokenError::NotAllowed => "NotAllowed: account is not on the allowlist",
            TokenError::InvalidRecipient => "InvalidRecipient: self-transfer is not permitted",
            TokenError::InvalidProof => "InvalidProof: encrypted input failed verification",
            TokenError::SupplyOverflow => "SupplyOverflow: total supply would exceed u64::MAX",
            TokenError::UnknownCiphertext => "UnknownCiphertext: no value stored for handle",
            TokenError::InvalidConfig => "InvalidConfig: malformed configuration value",
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for TokenError {}

// near-sdk's `FunctionError` is implemented for every `AsRef<str>`, which is
// what `#[handle_result]` needs to abort the call with this message.
impl AsRef<str> for TokenError {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_prefixed_with_variant() {
        let all = [
            TokenError::Unauthorized,
            TokenError::NotAllowed,
            TokenError::InvalidRecipient,
            TokenError::InvalidProof,
            TokenError::SupplyOverflow,
            TokenError::UnknownCiphertext,
            TokenError::InvalidConfig,
        ];
        for err in all {
            let variant = format!("{:?}", err);
            assert!(err.to_string().starts_with(&variant), "{err}");
            assert_eq!(err.as_ref(), err.as_str());
        }
    }
}
