use crate::core::{Block, BlockAcceptance, Ledger};
use crate::error::{LedgerError, Result};
use crate::network::client::PeerClient;
use crate::network::protocol::{encode_nodes, read_frame, write_frame, ChainResponse, Package, Request};
use crate::peers::{PeerAddr, PeerDirectory};
use log::{debug, error, info, warn};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// What to do once the reply has gone out.
enum FollowUp {
    Nothing,
    ResolveConflicts,
}

/// Listener side of the peer protocol
#[derive(Clone)]
pub struct Server {
    ledger: Arc<Ledger>,
    peers: Arc<PeerDirectory>,
    client: PeerClient,
    self_addr: PeerAddr,
}

impl Server {
    pub fn new(
        ledger: Arc<Ledger>,
        peers: Arc<PeerDirectory>,
        client: PeerClient,
        self_addr: PeerAddr,
    ) -> Server {
        Server {
            ledger,
            peers,
            client,
            self_addr,
        }
    }

    pub fn bind(addr: &str) -> Result<TcpListener> {
        TcpListener::bind(addr)
            .map_err(|e| LedgerError::Network(format!("Failed to bind to {addr}: {e}")))
    }

    /// Run the accept loop on its own thread. Each connection gets a thread
    /// of its own; a failing connection is logged and dropped.
    pub fn spawn(self, listener: TcpListener) -> Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);

        let thread = thread::Builder::new()
            .name(format!("listener-{}", local_addr.port()))
            .spawn(move || self.run(listener, &stop))?;

        info!("Server listening on {local_addr}");
        Ok(ServerHandle {
            local_addr,
            shutdown,
            thread: Some(thread),
        })
    }

    fn run(self, listener: TcpListener, shutdown: &AtomicBool) {
        for stream in listener.incoming() {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Error accepting connection: {e}");
                    continue;
                }
            };
            let peer_addr = match stream.peer_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("Failed to get peer address: {e}");
                    continue;
                }
            };

            let server = self.clone();
            let spawned = thread::Builder::new()
                .name(format!("conn-{peer_addr}"))
                .spawn(move || {
                    if let Err(e) = server.handle_connection(stream, peer_addr) {
                        error!("Error handling connection from {peer_addr}: {e}");
                    }
                });
            if let Err(e) = spawned {
                error!("Failed to spawn handler for {peer_addr}: {e}");
            }
        }
        debug!("Accept loop on {} stopped", self.self_addr);
    }

    fn handle_connection(&self, mut stream: TcpStream, peer_addr: SocketAddr) -> Result<()> {
        let timeout = Some(self.client.get_io_timeout());
        stream
            .set_read_timeout(timeout)
            .and_then(|_| stream.set_write_timeout(timeout))
            .map_err(|e| LedgerError::Network(format!("Failed to set timeouts: {e}")))?;

        let request = Request::decode(&read_frame(&mut stream)?)?;
        debug!("Received {} from {peer_addr}", request.kind());

        let (reply, follow_up) = self.process(request)?;
        write_frame(&mut stream, &reply)?;
        let _ = stream.shutdown(Shutdown::Both);

        // The pusher is waiting on our ack, so only fetch chains once it is sent.
        if let FollowUp::ResolveConflicts = follow_up {
            let replaced = self.ledger.resolve_conflicts(&self.peers, &self.client)?;
            info!("Conflict resolution after push from {peer_addr}: replaced={replaced}");
        }
        Ok(())
    }

    fn process(&self, request: Request) -> Result<(Vec<u8>, FollowUp)> {
        match request {
            Request::GetChain => {
                let response = ChainResponse::new(self.ledger.chain()?);
                Ok((response.encode()?, FollowUp::Nothing))
            }
            Request::GetNodes => Ok((encode_nodes(&self.peers.all())?, FollowUp::Nothing)),
            Request::Package(Package::RegisterPeer { addr }) => {
                if addr == self.self_addr {
                    debug!("Ignoring registration of own address {addr}");
                } else {
                    self.peers.register(addr);
                }
                Ok((vec![], FollowUp::Nothing))
            }
            Request::Package(Package::PushBlock { block }) => {
                let block = Block::deserialize(&block).map_err(|e| {
                    LedgerError::MalformedRequest(format!("Failed to deserialize block: {e}"))
                })?;
                let id = block.get_id();
                let follow_up = match self.ledger.accept_block(block)? {
                    BlockAcceptance::Appended | BlockAcceptance::AlreadyKnown => FollowUp::Nothing,
                    BlockAcceptance::Detached => {
                        warn!("Pushed block {id} does not extend the local chain");
                        FollowUp::ResolveConflicts
                    }
                };
                Ok((vec![], follow_up))
            }
        }
    }
}

/// Running listener; stops the accept loop on `shutdown` or drop.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until the accept loop exits.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Listener thread on {} panicked", self.local_addr);
            }
        }
    }

    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::SeqCst);

        // The accept loop only sees the flag once another connection arrives.
        let wake = if self.local_addr.ip().is_unspecified() {
            SocketAddr::from((Ipv4Addr::LOCALHOST, self.local_addr.port()))
        } else {
            self.local_addr
        };
        if let Err(e) = TcpStream::connect(wake) {
            warn!("Failed to wake listener on {wake}: {e}");
            return;
        }
        if thread.join().is_err() {
            error!("Listener thread on {} panicked", self.local_addr);
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
