//! Configuration management
//!
//! Node settings: listen and advertised addresses, the master peer to
//! bootstrap from, where the ledger lives on disk, and peer timeouts.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
