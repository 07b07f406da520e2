//! Utility functions and helpers
//!
//! Hashing, signing primitives, timestamps, the canonical bincode encoding
//! and local address detection.

pub mod crypto;
pub mod net;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_key_pair, ecdsa_p256_sha256_sign,
    ecdsa_p256_sha256_sign_verify, new_key_pair, sha256_digest, sha256_hex,
};
pub use net::local_ip;
pub use serialization::{deserialize, serialize};
