//! Test harness for ledger and network tests
//!
//! Temporary ledgers, signed payloads, localhost node configuration and a
//! canned `ChainFetcher`.

pub mod test_utils;

pub use test_utils::*;
