use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "peer-ledger")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a ledger node and serve peers")]
    StartNode {
        #[arg(long = "master", help = "Peer to bootstrap from, host:port")]
        master: Option<String>,
        #[arg(long = "ledger", help = "Name of the ledger to open")]
        ledger: Option<String>,
    },
    #[command(name = "insert", about = "Sign a JSON row and mine it into the ledger")]
    Insert {
        #[arg(help = "Row as a JSON object, e.g. '{\"sku\": \"A-1\"}'")]
        row: String,
        #[arg(long = "name", help = "Block label (defaults to 'row')")]
        name: Option<String>,
        #[arg(long = "master", help = "Peer to sync with before and after mining")]
        master: Option<String>,
        #[arg(long = "ledger", help = "Name of the ledger to open")]
        ledger: Option<String>,
    },
    #[command(name = "printchain", about = "Print all blocks of a local ledger")]
    Printchain {
        #[arg(long = "ledger", help = "Name of the ledger to print")]
        ledger: Option<String>,
    },
    #[command(name = "getnodes", about = "List the peers known to a node")]
    GetNodes {
        #[arg(help = "Node address, host:port")]
        addr: String,
    },
}
