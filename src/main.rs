// Entry point for the ledger node binary
use clap::Parser;
use log::{error, LevelFilter};
use peer_ledger::table::RecordTable;
use peer_ledger::{
    BlockStore, Command, Config, KeyPair, Ledger, Node, Opt, PeerAddr, PeerClient, GLOBAL_CONFIG,
};
use std::process;

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &opt.config {
        Some(path) => Config::load(Some(path.as_path()))?,
        None => GLOBAL_CONFIG.clone(),
    };

    match opt.command {
        Command::StartNode { master, ledger } => {
            apply_overrides(&mut config, master, ledger);
            let node = Node::start(&config)?;
            println!("Node {} listening as {}", node.get_id(), node.get_self_addr());
            node.wait();
        }
        Command::Insert {
            row,
            name,
            master,
            ledger,
        } => {
            apply_overrides(&mut config, master, ledger);
            // A one-shot client must not collide with a node already on the default port
            config.listen_addr = "0.0.0.0:0".to_string();

            let table = RecordTable::open(&config, KeyPair::generate()?)?;
            let block = match name {
                Some(name) => table.block(&name, serde_json::from_str(&row)?)?,
                None => table.insert_json(&row)?,
            };
            println!("Mined block {} ({})", block.get_id(), block.hash()?);
            table.close();
        }
        Command::Printchain { ledger } => {
            apply_overrides(&mut config, None, ledger);
            let store = BlockStore::for_ledger(&config.data_dir, &config.ledger_name);
            let chain = store.load_chain()?;
            if !Ledger::valid_chain(&chain) {
                println!("Warning: stored chain does not validate");
            }
            for block in chain {
                println!("Block {} '{}'", block.get_id(), block.get_name());
                println!("Hash: {}", block.hash()?);
                println!("Previous hash: {}", block.get_previous_hash());
                println!("Timestamp: {}", block.get_timestamp());
                println!("Proof: {}", block.get_proof());
                for tx in block.get_data() {
                    println!("- {}", tx.get_payload().canonical_json()?);
                }
                println!()
            }
        }
        Command::GetNodes { addr } => {
            let addr: PeerAddr = addr.parse()?;
            for peer in PeerClient::from_config(&config).fetch_nodes(&addr)? {
                println!("{peer}")
            }
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, master: Option<String>, ledger: Option<String>) {
    if master.is_some() {
        config.master_node = master;
    }
    if let Some(ledger) = ledger {
        config.ledger_name = ledger;
    }
}
