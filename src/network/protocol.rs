// Wire protocol: one request and one response per connection, each sent as
// a frame (u32 big-endian length, then the body).
//
// Request bodies are either a bare ASCII token (GET_CHAIN, GET_NODES) or a
// JSON envelope tagged with the message type. Responses to the tokens are
// bincode; envelopes get an empty frame back as acknowledgement.

use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::peers::PeerAddr;
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const GET_CHAIN: &[u8] = b"GET_CHAIN";
pub const GET_NODES: &[u8] = b"GET_NODES";

/// Upper bound on a single frame; a full chain response is the largest.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Messages that carry a body, dispatched on their `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Package {
    RegisterPeer { addr: PeerAddr },
    /// `block` is the canonical bincode encoding of the block.
    PushBlock { block: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    GetChain,
    GetNodes,
    Package(Package),
}

impl Request {
    pub fn register_peer(addr: PeerAddr) -> Request {
        Request::Package(Package::RegisterPeer { addr })
    }

    pub fn push_block(block: &Block) -> Result<Request> {
        Ok(Request::Package(Package::PushBlock {
            block: block.serialize()?,
        }))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Request::GetChain => Ok(GET_CHAIN.to_vec()),
            Request::GetNodes => Ok(GET_NODES.to_vec()),
            Request::Package(package) => Ok(serde_json::to_vec(package)?),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Request> {
        match bytes {
            GET_CHAIN => Ok(Request::GetChain),
            GET_NODES => Ok(Request::GetNodes),
            _ => serde_json::from_slice::<Package>(bytes)
                .map(Request::Package)
                .map_err(|e| LedgerError::MalformedRequest(format!("Unrecognised request: {e}"))),
        }
    }

    /// Short name for logs; a pushed block is too large to print.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::GetChain => "GET_CHAIN",
            Request::GetNodes => "GET_NODES",
            Request::Package(Package::RegisterPeer { .. }) => "register_peer",
            Request::Package(Package::PushBlock { .. }) => "push_block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct ChainResponse {
    length: u64,
    chain: Vec<Block>,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> ChainResponse {
        ChainResponse {
            length: chain.len() as u64,
            chain,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<ChainResponse> {
        deserialize(bytes)
    }

    /// `(reported length, chain)`; the two are not checked against each other.
    pub fn into_parts(self) -> (usize, Vec<Block>) {
        (self.length as usize, self.chain)
    }
}

pub fn encode_nodes(nodes: &[PeerAddr]) -> Result<Vec<u8>> {
    serialize(&nodes.to_vec())
}

pub fn decode_nodes(bytes: &[u8]) -> Result<Vec<PeerAddr>> {
    deserialize(bytes)
}

pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    if body.len() > MAX_FRAME_LEN {
        return Err(LedgerError::Network(format!(
            "Frame of {} bytes exceeds limit of {MAX_FRAME_LEN}",
            body.len()
        )));
    }
    let len = (body.len() as u32).to_be_bytes();
    writer
        .write_all(&len)
        .and_then(|_| writer.write_all(body))
        .and_then(|_| writer.flush())
        .map_err(|e| LedgerError::Network(format!("Failed to send frame: {e}")))
}

pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len = [0u8; 4];
    reader
        .read_exact(&mut len)
        .map_err(|e| LedgerError::Network(format!("Failed to read frame length: {e}")))?;
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_FRAME_LEN {
        return Err(LedgerError::MalformedRequest(format!(
            "Frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
        )));
    }

    // Grow with what actually arrives rather than trusting the prefix up front.
    let mut body = Vec::new();
    reader
        .take(len as u64)
        .read_to_end(&mut body)
        .map_err(|e| LedgerError::Network(format!("Failed to read frame body: {e}")))?;
    if body.len() != len {
        return Err(LedgerError::Network(format!(
            "Frame body ended after {} of {len} bytes",
            body.len()
        )));
    }
    Ok(body)
}
