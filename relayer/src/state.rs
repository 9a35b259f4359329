//! Application State
//!
//! Shared state for the relayer, accessible from all route handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::services::InputSigner;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    signer: InputSigner,
    /// Contracts served; empty serves any
    allowed_contracts: Vec<String>,
    max_ciphertext_bytes: usize,
    inputs_attested: AtomicU64,
    start_time: Instant,
}

impl AppState {
    pub fn new(signer: InputSigner, config: &Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                signer,
                allowed_contracts: config.allowed_contracts.clone(),
                max_ciphertext_bytes: config.max_ciphertext_bytes,
                inputs_attested: AtomicU64::new(0),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn signer(&self) -> &InputSigner {
        &self.inner.signer
    }

    pub fn serves(&self, contract_id: &str) -> bool {
        self.inner.allowed_contracts.is_empty()
            || self.inner.allowed_contracts.iter().any(|c| c == contract_id)
    }

    pub fn max_ciphertext_bytes(&self) -> usize {
        self.inner.max_ciphertext_bytes
    }

    pub fn inputs_attested(&self) -> u64 {
        self.inner.inputs_attested.load(Ordering::Relaxed)
    }

    pub fn increment_attested(&self) {
        self.inner.inputs_attested.fetch_add(1, Ordering::Relaxed);
    }

    /// Get server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
