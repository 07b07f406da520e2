use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{current_timestamp, deserialize, serialize, sha256_hex};
use serde::{Deserialize, Serialize};

pub const GENESIS_NAME: &str = "GENESIS";
pub const GENESIS_PREVIOUS_HASH: &str = "1";
pub const GENESIS_PROOF: u64 = 100;
// Fixed so that every node derives a byte-identical genesis block.
const GENESIS_TIMESTAMP: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    id: u64,
    name: String,
    data: Vec<Transaction>,
    timestamp: i64, // milliseconds since the Unix epoch
    proof: u64,
    previous_hash: String,
    signer_public_key: String,
}

impl Block {
    pub fn new_block(
        id: u64,
        name: &str,
        data: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
        signer_public_key: &str,
    ) -> Result<Block> {
        Ok(Block {
            id,
            name: name.to_string(),
            data,
            timestamp: current_timestamp()?,
            proof,
            previous_hash,
            signer_public_key: signer_public_key.to_string(),
        })
    }

    pub fn generate_genesis_block() -> Block {
        Block {
            id: 1,
            name: GENESIS_NAME.to_string(),
            data: vec![],
            timestamp: GENESIS_TIMESTAMP,
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            signer_public_key: String::new(),
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// SHA-256 over the canonical bincode bytes, lowercase hex.
    pub fn hash(&self) -> Result<String> {
        Ok(sha256_hex(&self.serialize()?))
    }

    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn get_data(&self) -> &[Transaction] {
        self.data.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_proof(&self) -> u64 {
        self.proof
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_signer_public_key(&self) -> &str {
        self.signer_public_key.as_str()
    }

    pub fn is_genesis(&self) -> bool {
        self.id == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Build a block with an explicit timestamp (for testing only)
    #[cfg(test)]
    pub fn new_test_block(
        id: u64,
        name: &str,
        data: Vec<Transaction>,
        timestamp: i64,
        proof: u64,
        previous_hash: &str,
    ) -> Block {
        Block {
            id,
            name: name.to_string(),
            data,
            timestamp,
            proof,
            previous_hash: previous_hash.to_string(),
            signer_public_key: String::new(),
        }
    }
}
