//! Core ledger functionality
//!
//! Blocks, signed transactions, the proof-of-work puzzle and the ledger
//! state machine that ties them together.

pub mod block;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, GENESIS_NAME, GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
pub use ledger::{BlockAcceptance, ChainFetcher, Ledger};
pub use proof_of_work::{ProofOfWork, DIFFICULTY_HEX_ZEROS};
pub use transaction::{Payload, Transaction};
