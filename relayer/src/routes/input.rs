//! Input attestation endpoint

use axum::{extract::State, routing::post, Json, Router};
use near_sdk::json_types::Base64VecU8;
use near_sdk::AccountId;
use tracing::{info, instrument, warn};

use crate::error::RelayerError;
use crate::services::signer::fingerprint;
use crate::state::AppState;
use crate::types::{AttestInputRequest, AttestInputResponse};

pub fn routes() -> Router<AppState> {
    Router::new().route("/input/attest", post(attest_input))
}

fn parse_account(raw: &str) -> Result<AccountId, RelayerError> {
    raw.parse()
        .map_err(|_| RelayerError::InvalidAccountId(raw.to_string()))
}

/// Attest an encrypted input for one contract and caller
/// POST /api/v1/input/attest
#[instrument(
    skip(state, request),
    fields(contract_id = %request.contract_id, caller_id = %request.caller_id)
)]
async fn attest_input(
    State(state): State<AppState>,
    Json(request): Json<AttestInputRequest>,
) -> Result<Json<AttestInputResponse>, RelayerError> {
    let contract = parse_account(&request.contract_id)?;
    let caller = parse_account(&request.caller_id)?;

    if !state.serves(contract.as_str()) {
        warn!("Contract not served");
        return Err(RelayerError::ContractNotServed(contract.to_string()));
    }

    let ciphertext = request.ciphertext.0;
    let max = state.max_ciphertext_bytes();
    if ciphertext.len() > max {
        return Err(RelayerError::CiphertextTooLarge {
            len: ciphertext.len(),
            max,
        });
    }

    let attestation = state
        .signer()
        .attest(&contract, &caller, &ciphertext)
        .map_err(|e| {
            warn!(error = %e, "Rejected input");
            RelayerError::from(e)
        })?;
    state.increment_attested();

    info!(
        request_id = %attestation.request_id,
        fingerprint = %fingerprint(&ciphertext),
        "Input attested"
    );

    Ok(Json(AttestInputResponse {
        request_id: attestation.request_id,
        ciphertext: Base64VecU8::from(ciphertext),
        proof: attestation.proof.signature,
        verifier_public_key: state.signer().public_key_hex(),
        issued_at: attestation.issued_at,
    }))
}
