//! # Confidential Token - Input Relayer
//!
//! Attests encrypted transfer amounts for the confidential token contract.
//! A ciphertext submitted to `transfer` is only accepted with a signature
//! from the contract's configured input verifier; this service holds that
//! key.
//!
//! ## Usage
//!
//! ```bash
//! # Development (throwaway key, printed at startup)
//! cargo run -p ctok-relayer
//!
//! # Production
//! VERIFIER_SECRET_KEY=<hex> ALLOWED_CONTRACTS=ctok.near cargo run -p ctok-relayer
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Verifier key, counters, uptime
//! - `POST /api/v1/input/attest` - Sign an input for `(contract, caller)`

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ctok_relayer::config::Config;
use ctok_relayer::routes::create_routes;
use ctok_relayer::services::InputSigner;
use ctok_relayer::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        allowed_contracts = ?config.allowed_contracts,
        "Starting confidential token input relayer"
    );

    let (signer, generated) = InputSigner::from_hex(config.verifier_secret_key.as_deref())
        .context("Failed to initialize input signer")?;
    if generated {
        warn!("VERIFIER_SECRET_KEY not set, using a throwaway key for development");
    }
    info!(
        pubkey = %signer.public_key_hex(),
        "Input verifier initialized"
    );

    let state = AppState::new(signer, &config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(cors_origin(&config.cors_origins)?);

    let app = create_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.socket_addr().context("Invalid HOST/PORT")?;
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_origin(origins: &[String]) -> anyhow::Result<AllowOrigin> {
    if origins.iter().any(|o| o == "*") {
        return Ok(AllowOrigin::from(Any));
    }
    let values = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin {o}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(AllowOrigin::list(values))
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_ansi(true))
            .init();
    }
}
