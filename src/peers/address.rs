use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// Network address of a peer node, `host:port`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct PeerAddr {
    host: String,
    port: u16,
}

impl PeerAddr {
    pub fn new(host: &str, port: u16) -> PeerAddr {
        PeerAddr {
            host: host.to_string(),
            port,
        }
    }

    pub fn get_host(&self) -> &str {
        self.host.as_str()
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Resolve to the first socket address the host maps to.
    pub fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| LedgerError::Network(format!("Failed to resolve {self}: {e}")))?
            .next()
            .ok_or_else(|| LedgerError::Network(format!("No address found for {self}")))
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for PeerAddr {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| LedgerError::Config(format!("Peer address {s} must be host:port")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(LedgerError::Config(format!("Peer address {s} has no host")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| LedgerError::Config(format!("Invalid port in {s}: {e}")))?;
        Ok(PeerAddr::new(host, port))
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        PeerAddr::new(&addr.ip().to_string(), addr.port())
    }
}
