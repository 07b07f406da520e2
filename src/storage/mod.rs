//! Block persistence
//!
//! File-per-block storage of a ledger's chain.

pub mod block_store;

pub use block_store::BlockStore;
