//! Request/response types and error codes for the relayer API

use near_sdk::json_types::Base64VecU8;
use serde::{Deserialize, Serialize};

/// Error codes returned by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Contract or caller is not a valid NEAR account id
    InvalidAccountId,
    /// Ciphertext is not a well-formed envelope
    InvalidEnvelope,
    /// Ciphertext exceeds the configured size limit
    CiphertextTooLarge,
    /// This relayer does not attest for the contract
    ContractNotServed,
    /// Internal server error
    InternalError,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Attest an encrypted input
/// POST /api/v1/input/attest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestInputRequest {
    /// Contract the input will be submitted to
    pub contract_id: String,
    /// Account that will submit it
    pub caller_id: String,
    /// Envelope bytes, base64
    pub ciphertext: Base64VecU8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestInputResponse {
    pub request_id: String,
    /// Echo of the attested ciphertext, base64
    pub ciphertext: Base64VecU8,
    /// ed25519 signature over the input digest, base64
    pub proof: Base64VecU8,
    /// Hex public key the contract must be configured with
    pub verifier_public_key: String,
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

/// Liveness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server status with more details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    /// Hex public key of the input verifier
    pub verifier_public_key: String,
    /// Total inputs attested since start
    pub inputs_attested: u64,
    /// Uptime in seconds
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        let json = serde_json::to_string(&ErrorCode::ContractNotServed).unwrap();
        assert_eq!(json, "\"CONTRACT_NOT_SERVED\"");
    }

    #[test]
    fn test_attest_request_from_json() {
        let request: AttestInputRequest = serde_json::from_str(
            r#"{"contract_id":"ctok.near","caller_id":"alice.near","ciphertext":"AQUAAAAAAAAAAA=="}"#,
        )
        .unwrap();
        assert_eq!(request.ciphertext.0, vec![1, 5, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
