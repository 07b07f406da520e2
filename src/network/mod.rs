//! Peer-to-peer networking
//!
//! Framed request/response messages over TCP: the listener that serves the
//! local chain and peer list, the client used to query other nodes, and the
//! node that wires both to a ledger and bootstraps against a master peer.

pub mod client;
pub mod node;
pub mod protocol;
pub mod server;

pub use client::PeerClient;
pub use node::Node;
pub use protocol::{ChainResponse, Package, Request, GET_CHAIN, GET_NODES, MAX_FRAME_LEN};
pub use server::{Server, ServerHandle};
