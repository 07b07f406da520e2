use crate::config::Config;
use crate::core::{Block, Ledger, Payload};
use crate::error::Result;
use crate::network::client::PeerClient;
use crate::network::server::{Server, ServerHandle};
use crate::peers::{PeerAddr, PeerDirectory};
use crate::storage::BlockStore;
use crate::utils::local_ip;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uuid::Uuid;

/// A running peer: the ledger, the peers it knows and the listener serving both.
pub struct Node {
    id: String,
    self_addr: PeerAddr,
    ledger: Arc<Ledger>,
    peers: Arc<PeerDirectory>,
    client: PeerClient,
    server: ServerHandle,
}

impl Node {
    /// Open the ledger, start listening and, if a master is configured,
    /// join its network.
    pub fn start(config: &Config) -> Result<Node> {
        let id = Uuid::new_v4().simple().to_string();
        let store = BlockStore::for_ledger(&config.data_dir, &config.ledger_name);
        let ledger = Arc::new(Ledger::open(store)?);
        let peers = Arc::new(PeerDirectory::with_policy(
            config.peer_failure_threshold,
            config.peer_cooldown(),
        ));
        let client = PeerClient::from_config(config);

        let listener = Server::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;
        let self_addr = Self::advertised_addr(config, local_addr);
        let server = Server::new(
            Arc::clone(&ledger),
            Arc::clone(&peers),
            client.clone(),
            self_addr.clone(),
        )
        .spawn(listener)?;
        info!("Node {id} started as {self_addr} (ledger '{}')", config.ledger_name);

        let node = Node {
            id,
            self_addr,
            ledger,
            peers,
            client,
            server,
        };
        if let Some(master) = config.master_addr()? {
            node.bootstrap(&master)?;
        }
        Ok(node)
    }

    fn advertised_addr(config: &Config, local_addr: SocketAddr) -> PeerAddr {
        let host = match &config.advertise_host {
            Some(host) => host.clone(),
            None if local_addr.ip().is_unspecified() => local_ip().to_string(),
            None => local_addr.ip().to_string(),
        };
        PeerAddr::new(&host, local_addr.port())
    }

    /// Learn the master's peers, announce ourselves, then sync the chain.
    /// An unreachable master leaves the node running on its own.
    fn bootstrap(&self, master: &PeerAddr) -> Result<()> {
        let known = match self.client.fetch_nodes(master) {
            Ok(known) => known,
            Err(e) => {
                warn!("Bootstrap against {master} failed: {e}");
                return Ok(());
            }
        };
        if let Err(e) = self.client.announce_self(master, &self.self_addr) {
            warn!("Failed to register with {master}: {e}");
            return Ok(());
        }

        for addr in known.into_iter().filter(|addr| *addr != self.self_addr) {
            self.register_peer(addr);
        }
        self.register_peer(master.clone());

        let replaced = self.ledger.resolve_conflicts(&self.peers, &self.client)?;
        info!(
            "Bootstrapped from {master}: {} peers, chain of {} blocks (replaced={replaced})",
            self.peers.len(),
            self.ledger.len()?
        );
        Ok(())
    }

    pub fn register_peer(&self, addr: PeerAddr) -> bool {
        if addr == self.self_addr {
            return false;
        }
        self.peers.register(addr)
    }

    pub fn submit_transaction(
        &self,
        payload: Payload,
        signature: Vec<u8>,
        public_key: &str,
    ) -> Result<u64> {
        self.ledger.submit_transaction(payload, signature, public_key)
    }

    /// Mine, push the block to every known peer, then resolve in case a
    /// faster peer already extended the chain.
    pub fn mine(&self, label: &str, public_key_pem: &str) -> Result<Block> {
        self.mine_with_cancel(label, public_key_pem, &AtomicBool::new(false))
    }

    pub fn mine_with_cancel(
        &self,
        label: &str,
        public_key_pem: &str,
        cancel: &AtomicBool,
    ) -> Result<Block> {
        let block = self.ledger.mine_with_cancel(label, public_key_pem, cancel)?;
        for addr in self.peers.all() {
            self.client.push_block(&addr, &block);
        }
        self.resolve_conflicts()?;
        Ok(block)
    }

    /// The chain after a round of conflict resolution.
    pub fn get_chain(&self) -> Result<Vec<Block>> {
        self.resolve_conflicts()?;
        self.ledger.chain()
    }

    pub fn resolve_conflicts(&self) -> Result<bool> {
        self.ledger.resolve_conflicts(&self.peers, &self.client)
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_self_addr(&self) -> &PeerAddr {
        &self.self_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn get_ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn get_peers(&self) -> &PeerDirectory {
        &self.peers
    }

    /// Serve peers until the listener stops.
    pub fn wait(self) {
        self.server.join();
    }

    pub fn shutdown(mut self) {
        self.server.shutdown();
        info!("Node {} stopped", self.id);
    }
}
