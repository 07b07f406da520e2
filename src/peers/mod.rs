//! Known peers
//!
//! Peer addresses and the shared directory the ledger and the listener
//! both read and register into.

pub mod address;
pub mod directory;

pub use address::PeerAddr;
pub use directory::PeerDirectory;
