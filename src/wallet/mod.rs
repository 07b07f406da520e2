//! Signing keys
//!
//! ECDSA P-256 key pairs used to sign transaction payloads, and the PEM
//! encoding public keys travel in.

pub mod keys;

pub use keys::{public_key_from_pem, public_key_to_pem, verify_signature, KeyPair};
