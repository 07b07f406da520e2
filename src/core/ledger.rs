// The ledger is the proof-of-work chain state machine: genesis, admission of
// signed transactions, mining, validation of foreign chains and the
// longest-valid-chain rule. All chain/pending mutation happens under one
// mutex; the proof-of-work search itself runs outside it.

use crate::core::{Block, Payload, ProofOfWork, Transaction};
use crate::error::{LedgerError, Result};
use crate::peers::{PeerAddr, PeerDirectory};
use crate::storage::BlockStore;
use log::{debug, info, warn};
use std::sync::atomic::AtomicBool;
use std::sync::{Mutex, MutexGuard};

/// Where conflict resolution gets peer chains from. The network client is the
/// production implementation; tests plug in canned chains.
pub trait ChainFetcher {
    /// `(reported length, chain)` as served by `addr`.
    fn fetch_chain(&self, addr: &PeerAddr) -> Result<(usize, Vec<Block>)>;
}

/// Outcome of offering a single externally received block to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAcceptance {
    /// Extended the local tip.
    Appended,
    /// Identical to a block already in the chain.
    AlreadyKnown,
    /// Does not link to the local tip; the chains have diverged.
    Detached,
}

struct LedgerState {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    store: BlockStore,
}

impl Ledger {
    /// Load the chain from `store`, creating and persisting genesis if empty.
    pub fn open(store: BlockStore) -> Result<Ledger> {
        let mut chain = store.load_chain()?;
        if chain.is_empty() {
            let genesis = Block::generate_genesis_block();
            store.save_block(&genesis)?;
            info!("Created genesis block in {}", store.get_dir().display());
            chain.push(genesis);
        } else {
            info!(
                "Loaded {} blocks from {}",
                chain.len(),
                store.get_dir().display()
            );
            if !Self::valid_chain(&chain) {
                warn!("Stored chain in {} does not validate", store.get_dir().display());
            }
        }

        Ok(Ledger {
            state: Mutex::new(LedgerState {
                chain,
                pending: vec![],
            }),
            store,
        })
    }

    fn state(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire ledger lock: {e}")))
    }

    pub fn get_store(&self) -> &BlockStore {
        &self.store
    }

    /// Buffer a transaction if its signature checks out.
    ///
    /// Returns the id of the block it is expected to land in. That is a hint
    /// only: a chain replacement before the next mine can move it.
    pub fn submit_transaction(
        &self,
        payload: Payload,
        signature: Vec<u8>,
        public_key: &str,
    ) -> Result<u64> {
        self.submit(Transaction::new(payload, signature, public_key))
    }

    pub fn submit(&self, transaction: Transaction) -> Result<u64> {
        transaction.check_signature()?;
        let mut state = self.state()?;
        state.pending.push(transaction);
        let next_id = Self::tip(&state)?.get_id() + 1;
        debug!(
            "Accepted transaction for block {next_id} ({} pending)",
            state.pending.len()
        );
        Ok(next_id)
    }

    /// Seal every pending transaction into a new block. Blocks for the whole
    /// proof-of-work search.
    pub fn mine(&self, label: &str, public_key_pem: &str) -> Result<Block> {
        self.mine_with_cancel(label, public_key_pem, &AtomicBool::new(false))
    }

    pub fn mine_with_cancel(
        &self,
        label: &str,
        public_key_pem: &str,
        cancel: &AtomicBool,
    ) -> Result<Block> {
        loop {
            let tip = self.last_block()?;
            let proof = ProofOfWork::new_proof_of_work(tip.get_proof())
                .run_until_cancelled(cancel)
                .ok_or_else(|| LedgerError::Mining("proof-of-work search cancelled".to_string()))?;

            let mut state = self.state()?;
            if Self::tip(&state)? != &tip {
                info!("Chain tip moved during proof-of-work, searching again");
                continue;
            }

            let block = Block::new_block(
                tip.get_id() + 1,
                label,
                state.pending.clone(),
                proof,
                tip.hash()?,
                public_key_pem,
            )?;
            // Persist first: a block that only exists in memory would be lost
            // on restart and leave disk and chain disagreeing.
            self.store.save_block(&block)?;
            state.pending.clear();
            state.chain.push(block.clone());

            info!(
                "Mined block {} '{}' with {} transactions (proof {})",
                block.get_id(),
                block.get_name(),
                block.get_data().len(),
                block.get_proof()
            );
            return Ok(block);
        }
    }

    /// Chain linkage and proof-of-work for every adjacent pair.
    /// An empty chain is invalid; a single block is trivially valid.
    pub fn valid_chain(chain: &[Block]) -> bool {
        if chain.is_empty() {
            return false;
        }
        chain
            .windows(2)
            .all(|pair| Self::links_to(&pair[0], &pair[1]))
    }

    /// Whether `block` may directly follow `previous`.
    pub fn links_to(previous: &Block, block: &Block) -> bool {
        let previous_hash = match previous.hash() {
            Ok(hash) => hash,
            Err(_) => return false,
        };
        block.get_id() == previous.get_id() + 1
            && block.get_previous_hash() == previous_hash
            && ProofOfWork::valid_proof(previous.get_proof(), block.get_proof())
    }

    /// Adopt the longest valid peer chain if it beats the local one.
    ///
    /// Unreachable peers and malformed or invalid chains are skipped. Among
    /// equally long winners the one with the smallest tip hash is taken, so
    /// the outcome does not depend on peer order.
    pub fn resolve_conflicts<F>(&self, peers: &PeerDirectory, fetcher: &F) -> Result<bool>
    where
        F: ChainFetcher + ?Sized,
    {
        let local_len = self.len()?;
        let mut best: Option<(Vec<Block>, String)> = None;

        for addr in peers.reachable() {
            let (length, chain) = match fetcher.fetch_chain(&addr) {
                Ok(reply) => {
                    peers.record_success(&addr);
                    reply
                }
                Err(e) => {
                    warn!("Skipping peer {addr}: {e}");
                    peers.record_failure(&addr);
                    continue;
                }
            };

            if length != chain.len() {
                warn!(
                    "Peer {addr} reported length {length} for a chain of {} blocks",
                    chain.len()
                );
                continue;
            }
            if length <= local_len {
                continue;
            }
            if !Self::valid_chain(&chain) {
                warn!("Discarding invalid chain of length {length} from {addr}");
                continue;
            }
            let tip_hash = match chain.last().map(Block::hash) {
                Some(Ok(hash)) => hash,
                _ => continue,
            };

            let better = match &best {
                None => true,
                Some((current, current_tip)) => {
                    chain.len() > current.len()
                        || (chain.len() == current.len() && tip_hash < *current_tip)
                }
            };
            if better {
                debug!("Peer {addr} offers the best chain so far ({length} blocks)");
                best = Some((chain, tip_hash));
            }
        }

        let Some((new_chain, tip_hash)) = best else {
            return Ok(false);
        };

        let mut state = self.state()?;
        // The local chain may have grown while peers were being queried.
        if new_chain.len() <= state.chain.len() {
            return Ok(false);
        }
        self.store.replace_chain(&state.chain, &new_chain)?;
        state
            .pending
            .retain(|tx| !new_chain.iter().any(|block| block.get_data().contains(tx)));
        info!(
            "Replaced chain of {} blocks with peer chain of {} blocks (tip {tip_hash})",
            state.chain.len(),
            new_chain.len()
        );
        state.chain = new_chain;
        Ok(true)
    }

    /// Offer a block pushed by a peer. Only a block that extends the tip is
    /// appended; anything else is left to conflict resolution.
    pub fn accept_block(&self, block: Block) -> Result<BlockAcceptance> {
        let mut state = self.state()?;

        if let Some(existing) = state
            .chain
            .iter()
            .find(|known| known.get_id() == block.get_id())
        {
            return Ok(if existing == &block {
                BlockAcceptance::AlreadyKnown
            } else {
                BlockAcceptance::Detached
            });
        }

        if !Self::links_to(Self::tip(&state)?, &block) {
            debug!("Block {} does not extend the local tip", block.get_id());
            return Ok(BlockAcceptance::Detached);
        }

        self.store.save_block(&block)?;
        state
            .pending
            .retain(|tx| !block.get_data().contains(tx));
        info!("Appended pushed block {} '{}'", block.get_id(), block.get_name());
        state.chain.push(block);
        Ok(BlockAcceptance::Appended)
    }

    pub fn last_block(&self) -> Result<Block> {
        let state = self.state()?;
        Ok(Self::tip(&state)?.clone())
    }

    pub fn chain(&self) -> Result<Vec<Block>> {
        Ok(self.state()?.chain.clone())
    }

    pub fn pending(&self) -> Result<Vec<Transaction>> {
        Ok(self.state()?.pending.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.state()?.chain.len())
    }

    fn tip(state: &LedgerState) -> Result<&Block> {
        state
            .chain
            .last()
            .ok_or_else(|| LedgerError::InvalidBlock("ledger has no genesis block".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{
        clone_ledger, create_test_ledger, mine_blocks, signed_payload, StubFetcher,
    };
    use crate::wallet::KeyPair;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fresh_ledger_has_genesis() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let chain = ledger.chain().unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].get_id(), 1);
        assert_eq!(chain[0].get_name(), "GENESIS");
        assert_eq!(chain[0].get_previous_hash(), "1");
        assert_eq!(chain[0].get_proof(), 100);
    }

    #[test]
    fn test_genesis_is_persisted() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let stored = ledger.get_store().load_chain().unwrap();
        assert_eq!(stored, ledger.chain().unwrap());
    }

    #[test]
    fn test_mine_with_empty_pending() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let block = ledger.mine("batch-1", "").unwrap();
        let chain = ledger.chain().unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].get_id(), 2);
        assert_eq!(chain[1].get_previous_hash(), chain[0].hash().unwrap());
        assert!(ProofOfWork::valid_proof(chain[0].get_proof(), chain[1].get_proof()));
        assert!(block.get_data().is_empty());
    }

    #[test]
    fn test_submit_returns_next_block_id() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let keys = KeyPair::generate().unwrap();
        let (payload, signature) = signed_payload(&keys, json!({"n": 1}));

        let next = ledger
            .submit_transaction(payload, signature, &keys.public_key_pem())
            .unwrap();
        assert_eq!(next, 2);
        assert_eq!(ledger.pending().unwrap().len(), 1);
    }

    #[test]
    fn test_tampered_transaction_is_rejected() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let keys = KeyPair::generate().unwrap();
        let (_, signature) = signed_payload(&keys, json!({"amount": 10}));

        let result = ledger.submit_transaction(
            Payload::new(json!({"amount": 11})),
            signature,
            &keys.public_key_pem(),
        );
        assert!(matches!(result, Err(LedgerError::RejectedTransaction(_))));
        assert!(ledger.pending().unwrap().is_empty());
    }

    #[test]
    fn test_mined_block_keeps_submission_order() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let keys = KeyPair::generate().unwrap();
        for n in 0..3 {
            let (payload, signature) = signed_payload(&keys, json!({ "n": n }));
            ledger
                .submit_transaction(payload, signature, &keys.public_key_pem())
                .unwrap();
        }

        let block = ledger.mine("batch", &keys.public_key_pem()).unwrap();
        let order: Vec<i64> = block
            .get_data()
            .iter()
            .map(|tx| tx.get_payload().get_value()["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(block.get_signer_public_key(), keys.public_key_pem());
        assert!(ledger.pending().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_loads_mined_chain() {
        let (ledger, temp_dir) = create_test_ledger().unwrap();
        mine_blocks(&ledger, 2).unwrap();
        let expected = ledger.chain().unwrap();
        drop(ledger);

        let reopened = Ledger::open(BlockStore::new(temp_dir.path())).unwrap();
        assert_eq!(reopened.chain().unwrap(), expected);
        assert!(Ledger::valid_chain(&expected));
    }

    #[test]
    fn test_valid_chain_detects_tampering() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        mine_blocks(&ledger, 2).unwrap();
        let chain = ledger.chain().unwrap();
        assert!(Ledger::valid_chain(&chain));
        assert!(Ledger::valid_chain(&chain[..1]));
        assert!(!Ledger::valid_chain(&[]));

        let mut relabelled = chain.clone();
        relabelled[1] = Block::new_test_block(
            2,
            "forged",
            vec![],
            chain[1].get_timestamp(),
            chain[1].get_proof(),
            chain[1].get_previous_hash(),
        );
        assert!(!Ledger::valid_chain(&relabelled));

        let mut bad_proof = chain.clone();
        bad_proof[2] = Block::new_test_block(
            3,
            chain[2].get_name(),
            vec![],
            chain[2].get_timestamp(),
            chain[2].get_proof() + 1,
            chain[2].get_previous_hash(),
        );
        assert!(!Ledger::valid_chain(&bad_proof));
    }

    #[test]
    fn test_resolve_adopts_longer_valid_chain() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = create_test_ledger().unwrap();
        mine_blocks(&local, 1).unwrap();
        mine_blocks(&remote, 2).unwrap();

        let peers = PeerDirectory::new();
        let peer = PeerAddr::new("10.0.0.2", 2001);
        peers.register(peer.clone());
        let fetcher = StubFetcher::new().with_chain(&peer, remote.chain().unwrap());

        assert!(local.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_eq!(local.chain().unwrap(), remote.chain().unwrap());
        assert_eq!(local.get_store().load_chain().unwrap(), remote.chain().unwrap());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = create_test_ledger().unwrap();
        mine_blocks(&remote, 1).unwrap();

        let peers = PeerDirectory::new();
        let peer = PeerAddr::new("10.0.0.2", 2001);
        peers.register(peer.clone());
        let fetcher = StubFetcher::new().with_chain(&peer, remote.chain().unwrap());

        assert!(local.resolve_conflicts(&peers, &fetcher).unwrap());
        let after_first = local.chain().unwrap();
        assert!(!local.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_eq!(local.chain().unwrap(), after_first);
    }

    #[test]
    fn test_resolve_ignores_equal_length_chain() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = create_test_ledger().unwrap();
        mine_blocks(&local, 1).unwrap();
        mine_blocks(&remote, 1).unwrap();
        let before = local.chain().unwrap();

        let peers = PeerDirectory::new();
        let peer = PeerAddr::new("10.0.0.2", 2001);
        peers.register(peer.clone());
        let fetcher = StubFetcher::new().with_chain(&peer, remote.chain().unwrap());

        assert!(!local.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_eq!(local.chain().unwrap(), before);
    }

    #[test]
    fn test_resolve_rejects_invalid_longer_chain() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = create_test_ledger().unwrap();
        mine_blocks(&remote, 2).unwrap();

        let mut forged = remote.chain().unwrap();
        forged[2] = Block::new_test_block(3, "forged", vec![], 0, 0, "deadbeef");

        let peers = PeerDirectory::new();
        let peer = PeerAddr::new("10.0.0.2", 2001);
        peers.register(peer.clone());
        let fetcher = StubFetcher::new().with_chain(&peer, forged);

        assert!(!local.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_eq!(local.len().unwrap(), 1);
    }

    #[test]
    fn test_resolve_skips_unreachable_and_misreported_peers() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = create_test_ledger().unwrap();
        mine_blocks(&remote, 1).unwrap();

        let peers = PeerDirectory::new();
        let down = PeerAddr::new("10.0.0.2", 2001);
        let liar = PeerAddr::new("10.0.0.3", 2001);
        let good = PeerAddr::new("10.0.0.4", 2001);
        for peer in [&down, &liar, &good] {
            peers.register(peer.clone());
        }
        let fetcher = StubFetcher::new()
            .with_reply(&liar, 9, remote.chain().unwrap())
            .with_chain(&good, remote.chain().unwrap());

        assert!(local.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_eq!(local.len().unwrap(), 2);
    }

    #[test]
    fn test_tie_between_divergent_peers_is_no_progress() {
        let (origin, _o) = create_test_ledger().unwrap();
        let (left, _l) = clone_ledger(&origin).unwrap();
        let (right, _r) = clone_ledger(&origin).unwrap();
        left.mine("left", "").unwrap();
        right.mine("right", "").unwrap();
        assert_ne!(left.chain().unwrap(), right.chain().unwrap());

        // Same-length third peer: neither divergent chain is strictly longer.
        let (third, _t) = clone_ledger(&origin).unwrap();
        third.mine("third", "").unwrap();
        let before = third.chain().unwrap();

        let peers = PeerDirectory::new();
        let a = PeerAddr::new("10.0.0.2", 2001);
        let b = PeerAddr::new("10.0.0.3", 2001);
        peers.register(a.clone());
        peers.register(b.clone());
        let fetcher = StubFetcher::new()
            .with_chain(&a, left.chain().unwrap())
            .with_chain(&b, right.chain().unwrap());

        assert!(!third.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_eq!(third.chain().unwrap(), before);
    }

    #[test]
    fn test_tie_break_prefers_smallest_tip_hash() {
        let (origin, _o) = create_test_ledger().unwrap();
        let (left, _l) = clone_ledger(&origin).unwrap();
        let (right, _r) = clone_ledger(&origin).unwrap();
        left.mine("left", "").unwrap();
        right.mine("right", "").unwrap();

        let left_tip = left.last_block().unwrap().hash().unwrap();
        let right_tip = right.last_block().unwrap().hash().unwrap();
        let expected = if left_tip < right_tip {
            left.chain().unwrap()
        } else {
            right.chain().unwrap()
        };

        let peers = PeerDirectory::new();
        let a = PeerAddr::new("10.0.0.2", 2001);
        let b = PeerAddr::new("10.0.0.3", 2001);
        peers.register(a.clone());
        peers.register(b.clone());
        let fetcher = StubFetcher::new()
            .with_chain(&a, left.chain().unwrap())
            .with_chain(&b, right.chain().unwrap());

        assert!(origin.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_eq!(origin.chain().unwrap(), expected);
    }

    #[test]
    fn test_resolve_drops_pending_sealed_in_adopted_chain() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = clone_ledger(&local).unwrap();
        let keys = KeyPair::generate().unwrap();
        let tx = Transaction::sign(Payload::new(json!({"k": "v"})), &keys).unwrap();

        local.submit(tx.clone()).unwrap();
        remote.submit(tx).unwrap();
        mine_blocks(&remote, 1).unwrap();

        let peers = PeerDirectory::new();
        let peer = PeerAddr::new("10.0.0.2", 2001);
        peers.register(peer.clone());
        let fetcher = StubFetcher::new().with_chain(&peer, remote.chain().unwrap());

        assert!(local.resolve_conflicts(&peers, &fetcher).unwrap());
        assert!(local.pending().unwrap().is_empty());
    }

    #[test]
    fn test_accept_block_extending_tip() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = clone_ledger(&local).unwrap();
        let block = remote.mine("pushed", "").unwrap();

        assert_eq!(local.accept_block(block.clone()).unwrap(), BlockAcceptance::Appended);
        assert_eq!(local.accept_block(block).unwrap(), BlockAcceptance::AlreadyKnown);
        assert_eq!(local.chain().unwrap(), remote.chain().unwrap());
        assert_eq!(local.get_store().load_block(2).unwrap(), remote.chain().unwrap().pop());
    }

    #[test]
    fn test_accept_block_rejects_unlinked_block() {
        let (local, _a) = create_test_ledger().unwrap();
        let stray = Block::new_test_block(2, "stray", vec![], 0, 1, "not-the-tip");
        assert_eq!(local.accept_block(stray).unwrap(), BlockAcceptance::Detached);

        let (remote, _b) = clone_ledger(&local).unwrap();
        mine_blocks(&remote, 2).unwrap();
        let far_ahead = remote.last_block().unwrap();
        assert_eq!(local.accept_block(far_ahead).unwrap(), BlockAcceptance::Detached);
        assert_eq!(local.len().unwrap(), 1);
    }

    #[test]
    fn test_cancelled_mine_keeps_pending() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let keys = KeyPair::generate().unwrap();
        ledger
            .submit(Transaction::sign(Payload::new(json!(1)), &keys).unwrap())
            .unwrap();

        let cancel = AtomicBool::new(true);
        let result = ledger.mine_with_cancel("never", "", &cancel);
        assert!(matches!(result, Err(LedgerError::Mining(_))));
        assert_eq!(ledger.pending().unwrap().len(), 1);
        assert_eq!(ledger.len().unwrap(), 1);
    }

    fn squat(ledger: &Ledger, file_name: &str) {
        std::fs::create_dir(ledger.get_store().get_dir().join(file_name)).unwrap();
    }

    fn assert_disk_matches_memory(ledger: &Ledger) {
        let stored = ledger.get_store().load_chain().unwrap();
        assert_eq!(stored, ledger.chain().unwrap());
        assert!(Ledger::valid_chain(&stored));
    }

    #[test]
    fn test_mine_storage_failure_keeps_state() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let keys = KeyPair::generate().unwrap();
        ledger
            .submit(Transaction::sign(Payload::new(json!({"n": 1})), &keys).unwrap())
            .unwrap();
        squat(&ledger, "block_2.tmp");

        let result = ledger.mine("blocked", "");
        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert_eq!(ledger.len().unwrap(), 1);
        assert_eq!(ledger.pending().unwrap().len(), 1);
        assert_disk_matches_memory(&ledger);
    }

    #[test]
    fn test_accept_block_storage_failure_keeps_state() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = clone_ledger(&local).unwrap();
        let block = remote.mine("pushed", "").unwrap();
        squat(&local, "block_2.tmp");

        let result = local.accept_block(block);
        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert_eq!(local.len().unwrap(), 1);
        assert_disk_matches_memory(&local);
    }

    #[test]
    fn test_resolve_storage_failure_keeps_disk_and_memory_in_step() {
        let (local, _a) = create_test_ledger().unwrap();
        let (remote, _b) = clone_ledger(&local).unwrap();
        mine_blocks(&local, 2).unwrap();
        for n in 0..4 {
            remote.mine(&format!("remote-{n}"), "").unwrap();
        }
        let before = local.chain().unwrap();
        let keys = KeyPair::generate().unwrap();
        local
            .submit(Transaction::sign(Payload::new(json!("kept")), &keys).unwrap())
            .unwrap();
        // Blocks 2 and 3 stage fine, block 4 does not.
        squat(&local, "block_4.tmp");

        let peers = PeerDirectory::new();
        let peer = PeerAddr::new("10.0.0.2", 2001);
        peers.register(peer.clone());
        let fetcher = StubFetcher::new().with_chain(&peer, remote.chain().unwrap());

        let result = local.resolve_conflicts(&peers, &fetcher);
        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert_eq!(local.chain().unwrap(), before);
        assert_eq!(local.pending().unwrap().len(), 1);
        assert_disk_matches_memory(&local);

        let reopened = Ledger::open(BlockStore::new(local.get_store().get_dir())).unwrap();
        assert_eq!(reopened.chain().unwrap(), before);

        // Once the disk is writable again the longer chain is adopted.
        std::fs::remove_dir(local.get_store().get_dir().join("block_4.tmp")).unwrap();
        assert!(local.resolve_conflicts(&peers, &fetcher).unwrap());
        assert_disk_matches_memory(&local);
        assert_eq!(local.chain().unwrap(), remote.chain().unwrap());
    }

    #[test]
    fn test_concurrent_submit_and_mine_lose_nothing() {
        let (ledger, _temp_dir) = create_test_ledger().unwrap();
        let ledger = Arc::new(ledger);
        let keys = Arc::new(KeyPair::generate().unwrap());

        let submitters: Vec<_> = (0..4)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                let keys = Arc::clone(&keys);
                thread::spawn(move || {
                    for n in 0..10 {
                        let tx = Transaction::sign(
                            Payload::new(json!({ "worker": worker, "n": n })),
                            &keys,
                        )
                        .unwrap();
                        ledger.submit(tx).unwrap();
                    }
                })
            })
            .collect();
        let miner = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || ledger.mine("concurrent", "").unwrap())
        };

        for handle in submitters {
            handle.join().unwrap();
        }
        miner.join().unwrap();
        ledger.mine("drain", "").unwrap();

        let sealed: usize = ledger
            .chain()
            .unwrap()
            .iter()
            .map(|block| block.get_data().len())
            .sum();
        assert_eq!(sealed, 40);
        assert!(ledger.pending().unwrap().is_empty());
    }
}
