mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cvgate_gateway::{build_router, start_server, AppState, IntakeService, RescanProcessor};
use cvgate_logging::redact_sensitive_data;
use cvgate_scanner::{HeuristicScanner, RemoteScanner, RiskScanner};
use cvgate_storage::{BlobStore, FsBlobStore, MemoryBlobStore, ScanLedger, SqliteScanLedger};

use config::Config;

#[derive(Parser)]
#[command(name = "cvgate")]
#[command(about = "cvgate — CV upload gateway with risk scanning")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the CV intake gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Keep blobs and the ledger in memory (no storage root required)
        #[arg(long)]
        memory: bool,
    },
    /// Show gateway health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    cvgate_logging::init_logger(&config.log_dir, &config.log_level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, memory } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config, memory).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/health", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("cvgate is not running on port {}", config.port);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config, memory: bool) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        policy = ?config.scan_failure_policy,
        "starting cvgate gateway"
    );

    let store: Arc<dyn BlobStore> = if memory {
        info!("using in-memory blob store");
        Arc::new(MemoryBlobStore::new())
    } else {
        let root = config.require_storage_root()?;
        info!(root = %redact_sensitive_data(root), "using filesystem blob store");
        Arc::new(FsBlobStore::new(root))
    };

    let ledger: Arc<dyn ScanLedger> = if memory {
        Arc::new(SqliteScanLedger::in_memory()?)
    } else {
        Arc::new(SqliteScanLedger::open(&config.ledger_db)?)
    };

    let scanner: Arc<dyn RiskScanner> = match &config.scanner_url {
        Some(url) => {
            info!(endpoint = %redact_sensitive_data(url), "using remote scanner");
            Arc::new(RemoteScanner::new(url.clone()))
        }
        None => {
            info!("using in-process heuristic scanner");
            Arc::new(HeuristicScanner::new())
        }
    };

    let intake = Arc::new(IntakeService::new(
        scanner,
        store.clone(),
        ledger.clone(),
        config.scan_failure_policy,
    ));

    let (rescan_tx, rescan_rx) = mpsc::channel(64);
    let processor = RescanProcessor::new(intake.clone(), store.clone(), ledger.clone());
    tokio::spawn(processor.run(rescan_rx));

    let state = AppState {
        intake,
        store,
        ledger,
        rescan_tx,
    };
    let router = build_router(state, config.max_upload_bytes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port).parse()?;
    start_server(addr, router).await
}
