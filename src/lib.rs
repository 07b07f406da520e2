//! # Peer Ledger - A Small Proof-of-Work Ledger With Peer Replication
//!
//! A ledger of signed application records: transactions are checked against
//! their detached signature, sealed into blocks by proof-of-work and copied
//! between nodes, each node adopting the longest valid chain it can find.
//!
//! ## How the Code Is Organized
//! - `core/`: blocks, signed transactions, proof-of-work and the ledger itself
//! - `storage/`: one file per block under a directory per ledger
//! - `peers/`: peer addresses and the directory of known peers
//! - `network/`: framed TCP protocol, listener, client and the node that wires them
//! - `table/`: the ledger used as an append-only table of JSON rows
//! - `wallet/`: ECDSA P-256 keys and PEM public keys
//! - `config/`: defaults, TOML file and environment
//! - `utils/`: hashing, timestamps and the canonical bincode encoding
//! - `cli/`: command-line arguments for the node binary
//!
//! Start with `network/node.rs` for how a node comes up and joins a network,
//! then `core/ledger.rs` for mining and conflict resolution.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod peers;
pub mod storage;
pub mod table;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    Block, BlockAcceptance, ChainFetcher, Ledger, Payload, ProofOfWork, Transaction,
    DIFFICULTY_HEX_ZEROS,
};
pub use error::{LedgerError, Result};
pub use network::{ChainResponse, Node, PeerClient, Request, Server, ServerHandle};
pub use peers::{PeerAddr, PeerDirectory};
pub use storage::BlockStore;
pub use table::{RecordTable, Row};
pub use utils::{current_timestamp, sha256_digest, sha256_hex};
pub use wallet::{verify_signature, KeyPair};
