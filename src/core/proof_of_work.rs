use crate::utils::sha256_digest;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};

/// Number of leading hex zeros a proof hash needs. Fixed; no retargeting.
pub const DIFFICULTY_HEX_ZEROS: usize = 4;

// How many candidates are tried between looks at the cancel flag.
const CANCEL_POLL_INTERVAL: u64 = 10_000;

/// Brute-force search for the proof that follows `last_proof`.
pub struct ProofOfWork {
    last_proof: u64,
}

impl ProofOfWork {
    pub fn new_proof_of_work(last_proof: u64) -> ProofOfWork {
        ProofOfWork { last_proof }
    }

    /// True iff sha256("{last_proof}{candidate}") starts with four hex zeros.
    pub fn valid_proof(last_proof: u64, candidate: u64) -> bool {
        let guess = format!("{last_proof}{candidate}");
        let hash = sha256_digest(guess.as_bytes());
        // Two zero bytes are exactly four zero hex characters.
        hash[..DIFFICULTY_HEX_ZEROS / 2].iter().all(|b| *b == 0)
    }

    /// Smallest non-negative proof for `last_proof`. Blocks until found.
    pub fn run(&self) -> u64 {
        let mut candidate: u64 = 0;
        while !Self::valid_proof(self.last_proof, candidate) {
            candidate += 1;
        }
        candidate
    }

    /// Returns `None` if `cancel` was raised before a proof turned up.
    pub fn run_until_cancelled(&self, cancel: &AtomicBool) -> Option<u64> {
        info!("Searching proof-of-work after proof {}", self.last_proof);
        let mut candidate: u64 = 0;
        loop {
            if candidate % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                info!("Proof-of-work search cancelled at candidate {candidate}");
                return None;
            }
            if Self::valid_proof(self.last_proof, candidate) {
                info!("Found proof {candidate} after proof {}", self.last_proof);
                return Some(candidate);
            }
            candidate += 1;
        }
    }
}
