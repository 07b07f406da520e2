use crate::config::Config;
use crate::core::{Block, ChainFetcher};
use crate::error::{LedgerError, Result};
use crate::network::protocol::{decode_nodes, read_frame, write_frame, ChainResponse, Request};
use crate::peers::PeerAddr;
use log::{debug, warn};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Outbound side of the peer protocol. Every call opens its own connection;
/// every failure comes back as `LedgerError::Network` or is logged and dropped.
#[derive(Debug, Clone)]
pub struct PeerClient {
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT)
    }
}

impl PeerClient {
    pub fn new(connect_timeout: Duration, io_timeout: Duration) -> PeerClient {
        PeerClient {
            connect_timeout,
            io_timeout,
        }
    }

    pub fn from_config(config: &Config) -> PeerClient {
        Self::new(config.connect_timeout(), config.io_timeout())
    }

    pub fn get_io_timeout(&self) -> Duration {
        self.io_timeout
    }

    pub fn fetch_chain(&self, addr: &PeerAddr) -> Result<(usize, Vec<Block>)> {
        let body = self.exchange(addr, &Request::GetChain)?;
        let response = ChainResponse::decode(&body)
            .map_err(|e| LedgerError::Network(format!("Bad chain from {addr}: {e}")))?;
        Ok(response.into_parts())
    }

    pub fn fetch_nodes(&self, addr: &PeerAddr) -> Result<Vec<PeerAddr>> {
        let body = self.exchange(addr, &Request::GetNodes)?;
        decode_nodes(&body).map_err(|e| LedgerError::Network(format!("Bad node list from {addr}: {e}")))
    }

    /// Best effort: failures are logged, never returned.
    pub fn push_block(&self, addr: &PeerAddr, block: &Block) {
        let result = Request::push_block(block).and_then(|request| self.exchange(addr, &request));
        match result {
            Ok(_) => debug!("Pushed block {} to {addr}", block.get_id()),
            Err(e) => warn!("Failed to push block {} to {addr}: {e}", block.get_id()),
        }
    }

    /// Ask `addr` to register `self_addr` as a peer.
    pub fn announce_self(&self, addr: &PeerAddr, self_addr: &PeerAddr) -> Result<()> {
        self.exchange(addr, &Request::register_peer(self_addr.clone()))?;
        debug!("Announced {self_addr} to {addr}");
        Ok(())
    }

    fn exchange(&self, addr: &PeerAddr, request: &Request) -> Result<Vec<u8>> {
        let mut stream = self.connect(addr)?;
        write_frame(&mut stream, &request.encode()?)?;
        let response = read_frame(&mut stream)?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(response)
    }

    fn connect(&self, addr: &PeerAddr) -> Result<TcpStream> {
        let socket_addr = addr.resolve()?;
        let stream = TcpStream::connect_timeout(&socket_addr, self.connect_timeout)
            .map_err(|e| LedgerError::Network(format!("Failed to connect to {addr}: {e}")))?;
        stream
            .set_read_timeout(Some(self.io_timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.io_timeout)))
            .map_err(|e| LedgerError::Network(format!("Failed to set timeouts for {addr}: {e}")))?;
        Ok(stream)
    }
}

impl ChainFetcher for PeerClient {
    fn fetch_chain(&self, addr: &PeerAddr) -> Result<(usize, Vec<Block>)> {
        PeerClient::fetch_chain(self, addr)
    }
}
