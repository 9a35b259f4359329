//! Services for the relayer

pub mod signer;

pub use signer::{Attestation, InputSigner, SignerError};
