//! Relayer errors and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::services::SignerError;
use crate::types::{ErrorCode, ErrorResponse};

#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("Invalid account id `{0}`")]
    InvalidAccountId(String),
    #[error("Ciphertext is {len} bytes, limit is {max}")]
    CiphertextTooLarge { len: usize, max: usize },
    #[error("Contract `{0}` is not served by this relayer")]
    ContractNotServed(String),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

impl RelayerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RelayerError::InvalidAccountId(_) => ErrorCode::InvalidAccountId,
            RelayerError::CiphertextTooLarge { .. } => ErrorCode::CiphertextTooLarge,
            RelayerError::ContractNotServed(_) => ErrorCode::ContractNotServed,
            RelayerError::Signer(SignerError::InvalidEnvelope) => ErrorCode::InvalidEnvelope,
            RelayerError::Signer(SignerError::InvalidSecretKey(_)) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::ContractNotServed => StatusCode::FORBIDDEN,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RelayerError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            details: None,
        };
        (self.status(), Json(body)).into_response()
    }
}
