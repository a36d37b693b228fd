//! CLI tool to create the DynamoDB api keys table
//!
//! Usage:
//!   cargo run --bin setup_tables
//!
//! For local development with DynamoDB Local:
//!   DYNAMODB_ENDPOINT_URL=http://localhost:8001 cargo run --bin setup_tables

use agent_gateway::config::{create_dynamodb_client, Settings};
use anyhow::Result;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use clap::Parser;

/// Create the DynamoDB table holding hashed API keys
#[derive(Parser, Debug)]
#[command(name = "setup_tables")]
#[command(about = "Create the DynamoDB api keys table")]
struct Args {
    /// DynamoDB endpoint URL (for local development)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Table name (defaults to DYNAMODB_API_KEYS_TABLE)
    #[arg(long)]
    table_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load()?;

    if args.endpoint_url.is_some() {
        settings.dynamodb_endpoint_url = args.endpoint_url;
    }
    if let Some(table_name) = args.table_name {
        settings.dynamodb_api_keys_table = table_name;
    }

    let client = create_dynamodb_client(&settings).await;
    let table_name = &settings.dynamodb_api_keys_table;

    if create_api_keys_table(&client, table_name).await? {
        println!("Created table: {}", table_name);
    } else {
        println!("Table already exists: {}", table_name);
    }

    Ok(())
}

/// Returns `Ok(false)` when the table already exists
async fn create_api_keys_table(client: &aws_sdk_dynamodb::Client, table_name: &str) -> Result<bool> {
    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("hashed_key")
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("hashed_key")
                .key_type(KeyType::Hash)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(e) if e.as_service_error().is_some_and(|se| se.is_resource_in_use_exception()) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
