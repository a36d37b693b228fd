//! CLI tool to mint an API key
//!
//! Only the SHA-256 hash of the key is stored; the raw key is printed once.
//!
//! Usage:
//!   cargo run --bin create_api_key -- --agent-id build-bot --name "CI runner"

use agent_gateway::auth::generate_api_key;
use agent_gateway::config::{Settings, StoreBackend};
use agent_gateway::db::{self, ApiKeyRecord};
use anyhow::{Context, Result};
use clap::Parser;

/// Mint a new `lc_` API key for an agent
#[derive(Parser, Debug)]
#[command(name = "create_api_key")]
#[command(about = "Mint a new API key and store its hash")]
struct Args {
    /// Agent the key authenticates as
    #[arg(short, long)]
    agent_id: String,

    /// Human-readable name for the key
    #[arg(short, long)]
    name: Option<String>,

    /// Key store backend (defaults to STORE_BACKEND)
    #[arg(long)]
    store: Option<StoreBackend>,

    /// DynamoDB table name (defaults to DYNAMODB_API_KEYS_TABLE)
    #[arg(long)]
    table_name: Option<String>,

    /// DynamoDB endpoint URL (for local development)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// SQLite connection URL (defaults to SQLITE_URL)
    #[arg(long)]
    sqlite_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load()?;

    if let Some(store) = args.store {
        settings.store_backend = store;
    }
    if let Some(table_name) = args.table_name {
        settings.dynamodb_api_keys_table = table_name;
    }
    if args.endpoint_url.is_some() {
        settings.dynamodb_endpoint_url = args.endpoint_url;
    }
    if let Some(sqlite_url) = args.sqlite_url {
        settings.sqlite_url = sqlite_url;
    }

    if settings.store_backend == StoreBackend::Memory {
        anyhow::bail!("The memory store does not outlive this process; use --store dynamodb or --store sqlite");
    }

    let store = db::connect_store(&settings).await?;

    let (api_key, hashed_key) = generate_api_key();
    let mut record = ApiKeyRecord::new(hashed_key, args.agent_id.clone());
    if let Some(name) = &args.name {
        record = record.with_name(name.clone());
    }

    store
        .insert(record)
        .await
        .context("Failed to store API key")?;

    println!("\nAPI key created successfully!\n");
    println!("API Key:  {}", api_key);
    println!("Agent ID: {}", args.agent_id);
    if let Some(name) = &args.name {
        println!("Name:     {}", name);
    }
    println!("Store:    {}", store.backend_name());
    println!("\nThis key is shown only once. Use it with:");
    println!("  Authorization: Bearer {}", api_key);

    Ok(())
}
