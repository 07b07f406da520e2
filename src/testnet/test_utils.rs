//! Test utilities for ledger testing

use crate::config::Config;
use crate::core::{Block, ChainFetcher, Ledger, Payload};
use crate::error::{LedgerError, Result};
use crate::peers::PeerAddr;
use crate::storage::BlockStore;
use crate::wallet::KeyPair;
use serde_json::Value;
use std::collections::HashMap;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn create_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(|e| LedgerError::Io(e.to_string()))
}

/// Create a ledger with only its genesis block, backed by a temporary directory
pub fn create_test_ledger() -> Result<(Ledger, TempDir)> {
    let temp_dir = create_temp_dir()?;
    let ledger = Ledger::open(BlockStore::new(temp_dir.path()))?;
    Ok((ledger, temp_dir))
}

/// Create a second ledger that starts from a copy of `ledger`'s chain
pub fn clone_ledger(ledger: &Ledger) -> Result<(Ledger, TempDir)> {
    let temp_dir = create_temp_dir()?;
    let store = BlockStore::new(temp_dir.path());
    for block in ledger.chain()? {
        store.save_block(&block)?;
    }
    Ok((Ledger::open(store)?, temp_dir))
}

/// Mine `count` blocks, draining whatever is pending into the first one
pub fn mine_blocks(ledger: &Ledger, count: usize) -> Result<Vec<Block>> {
    let mut blocks = Vec::with_capacity(count);
    for i in 0..count {
        blocks.push(ledger.mine(&format!("test-batch-{i}"), "")?);
    }
    Ok(blocks)
}

/// Payload plus the detached signature `keys` makes over it
pub fn signed_payload(keys: &KeyPair, value: Value) -> (Payload, Vec<u8>) {
    let payload = Payload::new(value);
    let signature = keys
        .sign(&payload.canonical_bytes().unwrap())
        .unwrap();
    (payload, signature)
}

/// Node configuration bound to an ephemeral localhost port
pub fn test_node_config(data_dir: &TempDir, master: Option<&PeerAddr>) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        advertise_host: Some("127.0.0.1".to_string()),
        master_node: master.map(ToString::to_string),
        ledger_name: "test".to_string(),
        data_dir: data_dir.path().to_path_buf(),
        connect_timeout_ms: 1_000,
        io_timeout_ms: 5_000,
        ..Config::default()
    }
}

/// Chain fetcher that serves canned replies; unknown peers are unreachable
#[derive(Default)]
pub struct StubFetcher {
    replies: HashMap<PeerAddr, (usize, Vec<Block>)>,
}

impl StubFetcher {
    pub fn new() -> StubFetcher {
        StubFetcher::default()
    }

    pub fn with_chain(self, addr: &PeerAddr, chain: Vec<Block>) -> StubFetcher {
        let length = chain.len();
        self.with_reply(addr, length, chain)
    }

    pub fn with_reply(mut self, addr: &PeerAddr, length: usize, chain: Vec<Block>) -> StubFetcher {
        self.replies.insert(addr.clone(), (length, chain));
        self
    }
}

impl ChainFetcher for StubFetcher {
    fn fetch_chain(&self, addr: &PeerAddr) -> Result<(usize, Vec<Block>)> {
        self.replies
            .get(addr)
            .cloned()
            .ok_or_else(|| LedgerError::Network(format!("Failed to connect to {addr}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_ledger() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn test_clone_ledger_shares_history() {
        let (ledger, _a) = create_test_ledger().unwrap();
        mine_blocks(&ledger, 1).unwrap();
        let (copy, _b) = clone_ledger(&ledger).unwrap();
        assert_eq!(copy.chain().unwrap(), ledger.chain().unwrap());
    }

    #[test]
    fn test_stub_fetcher_unknown_peer_is_unreachable() {
        let fetcher = StubFetcher::new();
        let result = fetcher.fetch_chain(&PeerAddr::new("10.0.0.9", 1));
        assert!(matches!(result, Err(LedgerError::Network(_))));
    }
}
