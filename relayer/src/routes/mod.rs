//! HTTP Routes for the relayer

pub mod health;
pub mod input;

use axum::Router;

use crate::state::AppState;

/// Create all routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest("/api/v1", input::routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::InputSigner;
    use crate::types::{AttestInputResponse, ErrorCode, ErrorResponse, StatusResponse};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use confidential_token::input::{input_digest, seal_u64, InputProof, InputVerifier};
    use serde_json::json;
    use tower::ServiceExt;

    fn app_with(config: Config) -> (Router, AppState) {
        let state = AppState::new(InputSigner::new(&[5u8; 32]), &config);
        (create_routes(state.clone()), state)
    }

    fn app() -> Router {
        app_with(Config::default()).0
    }

    fn attest_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/input/attest")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn b64(bytes: &[u8]) -> serde_json::Value {
        serde_json::to_value(near_sdk::json_types::Base64VecU8::from(bytes.to_vec())).unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_attest_round_trip() {
        let (app, state) = app_with(Config::default());
        let ciphertext = seal_u64(200_000);

        let response = app
            .clone()
            .oneshot(attest_request(json!({
                "contract_id": "ctok.near",
                "caller_id": "alice.near",
                "ciphertext": b64(&ciphertext),
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: AttestInputResponse = read_json(response).await;
        assert_eq!(body.ciphertext.0, ciphertext);

        // the contract side accepts the proof
        let verifier = InputVerifier::from_hex(&body.verifier_public_key).unwrap();
        let digest = input_digest("ctok.near", "alice.near", &ciphertext);
        let proof = InputProof::new(body.proof.0);
        assert!(verifier.verify(&digest, &proof).is_ok());
        assert_eq!(state.inputs_attested(), 1);

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status: StatusResponse = read_json(response).await;
        assert_eq!(status.inputs_attested, 1);
        assert_eq!(status.verifier_public_key, body.verifier_public_key);
    }

    #[tokio::test]
    async fn test_rejects_invalid_account_id() {
        let response = app()
            .oneshot(attest_request(json!({
                "contract_id": "ctok.near",
                "caller_id": "Not An Account",
                "ciphertext": b64(&seal_u64(1)),
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.code, ErrorCode::InvalidAccountId);
    }

    #[tokio::test]
    async fn test_rejects_bad_envelope() {
        let mut ciphertext = seal_u64(1);
        ciphertext[0] = 9;
        let response = app()
            .oneshot(attest_request(json!({
                "contract_id": "ctok.near",
                "caller_id": "alice.near",
                "ciphertext": b64(&ciphertext),
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.code, ErrorCode::InvalidEnvelope);
    }

    #[tokio::test]
    async fn test_rejects_oversized_ciphertext() {
        let config = Config {
            max_ciphertext_bytes: 4,
            ..Config::default()
        };
        let response = app_with(config)
            .0
            .oneshot(attest_request(json!({
                "contract_id": "ctok.near",
                "caller_id": "alice.near",
                "ciphertext": b64(&seal_u64(1)),
            })))
            .await
            .unwrap();
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.code, ErrorCode::CiphertextTooLarge);
    }

    #[tokio::test]
    async fn test_rejects_unserved_contract() {
        let config = Config {
            allowed_contracts: vec!["ctok.near".to_string()],
            ..Config::default()
        };
        let (app, state) = app_with(config);
        let response = app
            .oneshot(attest_request(json!({
                "contract_id": "other.near",
                "caller_id": "alice.near",
                "ciphertext": b64(&seal_u64(1)),
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.code, ErrorCode::ContractNotServed);
        assert_eq!(state.inputs_attested(), 0);
    }
}
