// Library entry point for the relayer
// Exposes core modules for testing and external use

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;

pub use services::signer;
