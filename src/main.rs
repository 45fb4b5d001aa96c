use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use saga_adapter::config::{AdapterConfig, AdapterContext};
use saga_adapter::domain::channel::channel;
use saga_adapter::domain::ports::{KeyValueStore, KeyValueStoreHandle};
use saga_adapter::error::SagaError;
use saga_adapter::infrastructure::in_memory::{InMemoryKeyValueStore, InMemoryPubSub};
#[cfg(feature = "storage-rocksdb")]
use saga_adapter::infrastructure::rocksdb::RocksDbKeyValueStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: AdapterConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the channel a saga phase and its correlation ids map to
    Channel {
        phase: String,
        ids: Vec<String>,
    },
    /// Print the persisted record of a saga
    Inspect { key: String },
    /// Delete the persisted record of a saga
    Delete { key: String },
}

fn open_store(config: &AdapterConfig) -> Result<KeyValueStoreHandle> {
    match &config.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDbKeyValueStore::open(path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryKeyValueStore::new()))
        }
        None => Ok(Arc::new(InMemoryKeyValueStore::new())),
    }
}

fn build_context(config: &AdapterConfig) -> Result<AdapterContext> {
    Ok(AdapterContext::new(
        open_store(config)?,
        Arc::new(InMemoryPubSub::new()),
        config.request_processing_timeout(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Channel { phase, ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            println!("{}", channel(&phase, &ids));
        }
        Command::Inspect { key } => {
            let context = build_context(&cli.config)?;
            let bytes = context
                .kvs
                .get(&key)
                .await
                .into_diagnostic()?
                .ok_or(SagaError::NotFoundError { key })
                .into_diagnostic()?;
            let record: serde_json::Value = serde_json::from_slice(&bytes).into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&record).into_diagnostic()?
            );
        }
        Command::Delete { key } => {
            let context = build_context(&cli.config)?;
            if !context.kvs.exists(&key).await.into_diagnostic()? {
                return Err(SagaError::NotFoundError { key }).into_diagnostic();
            }
            context.kvs.delete(&key).await.into_diagnostic()?;
            info!(key = %key, "Saga record deleted");
        }
    }

    Ok(())
}
