use crate::error::{LedgerError, Result};
use crate::peers::PeerAddr;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration from defaults and the environment, read once per process.
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

static DEFAULT_NODE_ADDR: &str = "0.0.0.0:2001";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const MASTER_NODE_KEY: &str = "MASTER_NODE";
const LEDGER_NAME_KEY: &str = "LEDGER_NAME";
const DATA_DIR_KEY: &str = "DATA_DIR";
const ADVERTISE_HOST_KEY: &str = "ADVERTISE_HOST";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the listener binds, `host:port`. Port 0 picks a free port.
    pub listen_addr: String,
    /// Host announced to peers; detected from the local interface when unset.
    pub advertise_host: Option<String>,
    /// Peer to bootstrap from, `host:port`.
    pub master_node: Option<String>,
    pub ledger_name: String,
    pub data_dir: PathBuf,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
    pub peer_failure_threshold: u32,
    pub peer_cooldown_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: DEFAULT_NODE_ADDR.to_string(),
            advertise_host: None,
            master_node: None,
            ledger_name: "default".to_string(),
            data_dir: PathBuf::from("data"),
            connect_timeout_ms: 5_000,
            io_timeout_ms: 10_000,
            peer_failure_threshold: 3,
            peer_cooldown_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Config {
        let mut config = Config::default();
        config.apply_vars(|key| env::var(key).ok());
        config
    }

    /// Defaults, then the TOML file if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_vars(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from variables; `lookup` is `env::var` outside tests.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.listen_addr = addr;
        }
        if let Some(master) = lookup(MASTER_NODE_KEY) {
            self.master_node = Some(master);
        }
        if let Some(name) = lookup(LEDGER_NAME_KEY) {
            self.ledger_name = name;
        }
        if let Some(dir) = lookup(DATA_DIR_KEY) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup(ADVERTISE_HOST_KEY) {
            self.advertise_host = Some(host);
        }
    }

    pub fn master_addr(&self) -> Result<Option<PeerAddr>> {
        self.master_node
            .as_deref()
            .map(str::parse::<PeerAddr>)
            .transpose()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn peer_cooldown(&self) -> Duration {
        Duration::from_secs(self.peer_cooldown_secs)
    }
}
