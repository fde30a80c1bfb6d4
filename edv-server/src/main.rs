//! EDV Server - Encrypted Data Vault REST service
//!
//! Main server process exposing vault lifecycle, document CRUD,
//! encrypted-index query and batch endpoints over HTTP.

mod server;

use anyhow::Result;
use clap::Parser;
use edv_core::operation::{Config, EnabledExtensions, Operation};
use edv_core::provider::memory::MemEdvProvider;
use edv_core::provider::persistent::PersistentEdvProvider;
use edv_core::provider::EdvProvider;
use server::EdvServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "edv-server")]
#[command(about = "Encrypted Data Vault REST server")]
struct Args {
    /// HTTP bind address
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// HTTP port
    #[arg(short = 'p', long, default_value = "8071")]
    port: u16,

    /// Data directory; omit to run with the in-memory provider
    #[arg(short = 'D', long)]
    data_dir: Option<PathBuf>,

    /// Host URL prefix used in Location headers
    #[arg(long, default_value = "")]
    base_url: String,

    /// Allow queries to return full documents instead of document URLs
    #[arg(long)]
    extension_return_full_documents: bool,

    /// Enable the read-all-documents endpoint
    #[arg(long)]
    extension_read_all_documents: bool,

    /// Enable the batch endpoint
    #[arg(long)]
    extension_batch: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::new(format!(
        "edv_server={},edv_core={}",
        log_level, log_level
    ));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("EDV server starting");

    let provider: Arc<dyn EdvProvider> = match &args.data_dir {
        Some(data_dir) => {
            info!("Using document-store provider at {}", data_dir.display());
            Arc::new(PersistentEdvProvider::new(data_dir)?)
        }
        None => {
            info!("Using in-memory provider; state will not survive restarts");
            Arc::new(MemEdvProvider::new())
        }
    };

    let operation = Arc::new(Operation::new(Config {
        provider,
        auth_enable: false,
        auth_service: None,
        enabled_extensions: EnabledExtensions {
            return_full_documents_on_query: args.extension_return_full_documents,
            read_all_documents_endpoint: args.extension_read_all_documents,
            batch: args.extension_batch,
        },
        base_url: args.base_url,
    }));

    operation.create_config_store()?;
    info!("Configuration store ready");

    let bind_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let edv_server = EdvServer::new(operation);
    let server_handle = tokio::spawn(async move { edv_server.serve(bind_addr).await });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server completed normally"),
                Ok(Err(e)) => info!("Server error: {:?}", e),
                Err(e) => info!("Server task error: {}", e),
            }
        }
    }

    info!("EDV server shutdown complete");

    Ok(())
}
