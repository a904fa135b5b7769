#![forbid(unsafe_code)]
//! Key generation and transaction signing for ProvChain

use clap::{Parser, Subcommand};
use colored::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use provchain::crypto::KeyPair;
use provchain::transaction::Transaction;

const DEFAULT_KEY_FILE: &str = "wallet_keys.json";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Key file to read or write
    #[arg(long, global = true, default_value = DEFAULT_KEY_FILE)]
    keys: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a new key pair and writes it to the key file
    Gen {
        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },
    /// Signs a provenance event and submits it to a node
    Send {
        /// Node base URL
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        node: String,
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        product_id: String,
        #[arg(long)]
        event_type: String,
        #[arg(long, default_value = "")]
        metadata: String,
        #[arg(long, default_value_t = 0.0)]
        amount: f64,
    },
}

#[derive(Serialize, Deserialize)]
struct KeyFile {
    private_key: String,
    public_key: String,
    address: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Gen { force } => generate(&cli.keys, force)?,
        Commands::Send {
            node,
            recipient,
            product_id,
            event_type,
            metadata,
            amount,
        } => {
            let keypair = load_keys(&cli.keys)?;
            let mut tx = Transaction::new(
                keypair.address(),
                recipient,
                amount,
                product_id,
                event_type,
                metadata,
                chrono::Utc::now().timestamp(),
            );
            tx.sign(&keypair);
            send(&node, &tx).await?;
        }
    }

    Ok(())
}

fn generate(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!("{} already exists; pass --force to overwrite", path.display()).into());
    }

    let keypair = KeyPair::generate();
    let file = KeyFile {
        private_key: keypair.secret_key_hex(),
        public_key: keypair.public_key_hex(),
        address: keypair.address(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&file)?)?;

    println!("{}", "🔑 New key pair generated".bright_green());
    println!("Address: {}", file.address.bright_yellow());
    println!("Saved to {}", path.display());
    Ok(())
}

fn load_keys(path: &Path) -> Result<KeyPair, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {} (run `gen` first)", path.display(), e))?;
    let file: KeyFile = serde_json::from_str(&text)?;
    let keypair = KeyPair::from_secret_hex(&file.private_key)?;
    if keypair.address() != file.address {
        return Err(format!("{} is inconsistent: address does not match private key", path.display()).into());
    }
    Ok(keypair)
}

async fn send(node: &str, tx: &Transaction) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/transactions/new", node.trim_end_matches('/'));
    let response = reqwest::Client::new().post(&url).json(tx).send().await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await?;

    if status.is_success() {
        let message = body["message"].as_str().unwrap_or("accepted");
        println!("{} {}", "✅".bright_green(), message);
        Ok(())
    } else {
        let error = body["error"].as_str().unwrap_or("unknown error");
        println!("{} {} ({})", "❌".bright_red(), error, status);
        Err(format!("node rejected the transaction: {error}").into())
    }
}
