//! Relayer Configuration
//!
//! Loaded from environment variables, with a `.env` file honored if present.

use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

/// Relayer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// CORS allowed origins (`*` for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Input verifier secret key (hex, 32 bytes). Generated when absent.
    pub verifier_secret_key: Option<String>,

    /// Contracts this relayer attests for. Empty serves any contract.
    #[serde(default)]
    pub allowed_contracts: Vec<String>,

    /// Upper bound on submitted ciphertext size
    #[serde(default = "default_max_ciphertext_bytes")]
    pub max_ciphertext_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_ciphertext_bytes() -> usize {
    1024
}

/// Split a comma separated list, dropping blanks
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            json_logs: false,
            cors_origins: default_cors_origins(),
            verifier_secret_key: None,
            allowed_contracts: Vec::new(),
            max_ciphertext_bytes: default_max_ciphertext_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup("HOST").unwrap_or_else(default_host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_port),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(default_log_level),
            json_logs: lookup("JSON_LOGS").unwrap_or_default() == "true",
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| parse_list(&s))
                .unwrap_or_else(default_cors_origins),
            verifier_secret_key: lookup("VERIFIER_SECRET_KEY").filter(|s| !s.is_empty()),
            allowed_contracts: lookup("ALLOWED_CONTRACTS")
                .map(|s| parse_list(&s))
                .unwrap_or_default(),
            max_ciphertext_bytes: lookup("MAX_CIPHERTEXT_BYTES")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_max_ciphertext_bytes),
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
