//! Traffic-mirror sink.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 MIRROR SINK                   │
//!   Mirrored request     │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ─────────────────────┼─▶│   net   │──▶│   http   │──▶│  mirror   │  │
//!   (from gateway)       │  │listener │   │  server  │   │size+redact│  │
//!                        │  │deadlines│   │ handler  │   └─────┬─────┘  │
//!                        │  └─────────┘   └────┬─────┘         │        │
//!   200, empty body      │                     │               ▼        │
//!   ◀────────────────────┼─────────────────────┘        ┌────────────┐  │   JSON lines
//!   (discarded)          │                              │ FlowSink   │──┼──▶ stdout
//!                        │                              └────────────┘  │
//!                        │  ┌────────────┐   ┌──────────────────────┐   │
//!                        │  │   config   │   │ lifecycle: signals,  │   │
//!                        │  │            │   │ state, bounded drain │   │
//!                        │  └────────────┘   └──────────────────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use mirror_sink::config::{load_config, SinkConfig};
use mirror_sink::lifecycle::{signals, DrainOutcome, Shutdown};
use mirror_sink::net::Listener;
use mirror_sink::observability::{logging, FlowSink, JsonLineSink};
use mirror_sink::MirrorServer;

#[derive(Parser)]
#[command(name = "mirror-sink")]
#[command(about = "Logs size, timing and redacted metadata of mirrored HTTP requests", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => load_config(path),
        None => Ok(SinkConfig::default()),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            logging::init(&SinkConfig::default().logging.level);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.logging.level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        "Starting HTTP mirror sink"
    );

    let listener = match Listener::bind(&config.listener).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match signals::terminate().await {
            Ok(signal) => {
                tracing::info!(signal, "Shutdown signal received");
                trigger.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
        }
    });

    let sink: Arc<dyn FlowSink> = Arc::new(JsonLineSink::stdout());
    let server = MirrorServer::new(config, sink);

    match server.run(listener, shutdown.subscribe()).await {
        Ok(DrainOutcome::Completed) => {
            tracing::info!("Server exiting");
            ExitCode::SUCCESS
        }
        Ok(DrainOutcome::TimedOut { abandoned }) => {
            tracing::info!(abandoned, "Server exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
