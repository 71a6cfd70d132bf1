// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - GENESIS GENERATOR
//
// Creates node keys and the matching genesis allocation for a local network:
// - <out>/node-<i>/node_key.hex   (secret key, hex)
// - <out>/node-<i>.toml           (ready-to-run node config)
// - <out>/genesis.toml            (allocation only, to share with newcomers)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::Parser;
use serde::Serialize;
use shp_consensus::GenesisAccount;
use shp_core::{PublicKey, BOOTSTRAP_MONEY};
use shp_crypto::{generate_keypair, generate_keypair_from_seed, KeyPair};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "genesis")]
#[command(about = "StakeHeap genesis and node key generator", long_about = None)]
struct Args {
    /// Number of funded nodes
    #[arg(short, long, default_value_t = 3)]
    nodes: usize,

    /// Money given to each node
    #[arg(short, long, default_value_t = BOOTSTRAP_MONEY)]
    money: u64,

    /// First TCP port; node i listens on base_port + i
    #[arg(long, default_value_t = 47_800)]
    base_port: u16,

    /// Derive keys from this seed instead of the OS RNG (reproducible testnets)
    #[arg(long)]
    seed: Option<String>,

    #[arg(short, long, default_value = "testnet")]
    out: PathBuf,
}

#[derive(Debug, Serialize)]
struct AllocationFile<'a> {
    genesis: &'a [GenesisAccount],
}

/// The subset of the node config the generator fills in.
#[derive(Debug, Serialize)]
struct NodeFile<'a> {
    node_id: String,
    data_dir: PathBuf,
    key_file: PathBuf,
    listen_port: u16,
    peers: Vec<String>,
    genesis: &'a [GenesisAccount],
}

struct GeneratedNode {
    node_id: String,
    keypair: KeyPair,
    port: u16,
}

fn node_keypair(seed: Option<&str>, index: usize) -> Result<KeyPair, String> {
    match seed {
        Some(seed) => {
            // Pad so short seeds still meet the 32-byte minimum.
            let material = format!("shp-genesis/{seed}/{index:08}/{:0>16}", "");
            generate_keypair_from_seed(material.as_bytes()).map_err(|e| e.to_string())
        }
        None => Ok(generate_keypair()),
    }
}

fn generate(args: &Args) -> Result<(Vec<GeneratedNode>, Vec<GenesisAccount>), String> {
    if args.nodes == 0 {
        return Err("need at least one node".to_string());
    }
    let last_port = args.base_port as usize + args.nodes - 1;
    if last_port > u16::MAX as usize {
        return Err(format!("ports {}..={} do not fit in u16", args.base_port, last_port));
    }

    let mut nodes = Vec::with_capacity(args.nodes);
    let mut allocation = Vec::with_capacity(args.nodes);
    for i in 0..args.nodes {
        let keypair = node_keypair(args.seed.as_deref(), i)?;
        let public_key = PublicKey::from_slice(&keypair.public_key).map_err(|e| e.to_string())?;
        allocation.push(GenesisAccount {
            public_key,
            money: args.money,
        });
        nodes.push(GeneratedNode {
            node_id: format!("node-{i}"),
            keypair,
            port: args.base_port + i as u16,
        });
    }
    Ok((nodes, allocation))
}

fn write_files(out: &Path, nodes: &[GeneratedNode], allocation: &[GenesisAccount]) -> Result<(), String> {
    let io = |path: &Path, e: std::io::Error| format!("{}: {}", path.display(), e);
    fs::create_dir_all(out).map_err(|e| io(out, e))?;

    let genesis_path = out.join("genesis.toml");
    let text = toml::to_string_pretty(&AllocationFile { genesis: allocation }).map_err(|e| e.to_string())?;
    fs::write(&genesis_path, text).map_err(|e| io(&genesis_path, e))?;

    for node in nodes {
        let data_dir = out.join(&node.node_id);
        fs::create_dir_all(&data_dir).map_err(|e| io(&data_dir, e))?;
        let key_file = data_dir.join("node_key.hex");
        fs::write(&key_file, node.keypair.secret_hex()).map_err(|e| io(&key_file, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&key_file, fs::Permissions::from_mode(0o600)).map_err(|e| io(&key_file, e))?;
        }

        let peers = nodes
            .iter()
            .filter(|other| other.node_id != node.node_id)
            .map(|other| format!("127.0.0.1:{}", other.port))
            .collect();
        let file = NodeFile {
            node_id: node.node_id.clone(),
            data_dir: data_dir.clone(),
            key_file,
            listen_port: node.port,
            peers,
            genesis: allocation,
        };
        let config_path = out.join(format!("{}.toml", node.node_id));
        let text = toml::to_string_pretty(&file).map_err(|e| e.to_string())?;
        fs::write(&config_path, text).map_err(|e| io(&config_path, e))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    println!("\n🌱 STAKEHEAP GENESIS GENERATOR");
    println!("   {} nodes × {} money, ports from {}\n", args.nodes, args.money, args.base_port);

    let result = generate(&args).and_then(|(nodes, allocation)| {
        write_files(&args.out, &nodes, &allocation)?;
        Ok((nodes, allocation))
    });
    match result {
        Ok((nodes, allocation)) => {
            for (node, account) in nodes.iter().zip(&allocation) {
                println!("✓ {:<8} port {:<5} key {}", node.node_id, node.port, account.public_key);
            }
            println!("\n✅ Wrote {}/genesis.toml and one config per node", args.out.display());
            println!("   Run: shp-node --config {}/node-0.toml", args.out.display());
            println!("⚠️  Key files are secrets. Keep them out of version control.\n");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
