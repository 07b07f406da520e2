//! Record table
//!
//! A ledger used as an append-only table: each insert signs a JSON row with
//! the node's key and mines it into its own block, and reads collect every
//! row back with the block it landed in.

use crate::config::Config;
use crate::core::{Block, Payload, Transaction};
use crate::error::{LedgerError, Result};
use crate::network::Node;
use crate::wallet::KeyPair;
use serde::Serialize;
use serde_json::{Map, Value};

/// Label of blocks that hold table rows
pub const ROW_BLOCK_NAME: &str = "row";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub block_id: u64,
    /// Block timestamp, milliseconds since the Unix epoch
    pub inserted_at: i64,
    pub fields: Map<String, Value>,
}

pub struct RecordTable {
    node: Node,
    keys: KeyPair,
}

impl RecordTable {
    pub fn open(config: &Config, keys: KeyPair) -> Result<RecordTable> {
        let node = Node::start(config)?;
        Ok(RecordTable { node, keys })
    }

    /// Sign `payload`, submit it and mine it into a block labelled `name`.
    pub fn block(&self, name: &str, payload: Value) -> Result<Block> {
        let transaction = Transaction::sign(Payload::new(payload), &self.keys)?;
        self.node.submit_transaction(
            transaction.get_payload().clone(),
            transaction.get_signature().to_vec(),
            transaction.get_public_key(),
        )?;
        self.node.mine(name, &self.keys.public_key_pem())
    }

    pub fn insert(&self, row: Map<String, Value>) -> Result<Block> {
        self.block(ROW_BLOCK_NAME, Value::Object(row))
    }

    /// Insert a row given as JSON text; anything but an object is refused.
    pub fn insert_json(&self, text: &str) -> Result<Block> {
        match serde_json::from_str(text)? {
            Value::Object(row) => self.insert(row),
            other => Err(LedgerError::Serialization(format!(
                "Row must be a JSON object, got {other}"
            ))),
        }
    }

    /// Every row in the chain, oldest first. Non-object payloads in row
    /// blocks are skipped.
    pub fn select(&self) -> Result<Vec<Row>> {
        Ok(rows_in(&self.node.get_chain()?))
    }

    pub fn public_key_pem(&self) -> String {
        self.keys.public_key_pem()
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn close(self) {
        self.node.shutdown();
    }
}

pub fn rows_in(chain: &[Block]) -> Vec<Row> {
    chain
        .iter()
        .filter(|block| block.get_name() == ROW_BLOCK_NAME)
        .flat_map(|block| {
            block.get_data().iter().filter_map(move |tx| match tx.get_payload().get_value() {
                Value::Object(fields) => Some(Row {
                    block_id: block.get_id(),
                    inserted_at: block.get_timestamp(),
                    fields: fields.clone(),
                }),
                _ => None,
            })
        })
        .collect()
}
