//! WolfController - Distributed Cluster Controller Participant
//!
//! Runs the participant process: receives transition messages over HTTP
//! and drives the controller leadership state model.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfcontroller::api::HttpServer;
use wolfcontroller::config::ControllerConfig;
use wolfcontroller::error::{Error, Result};
use wolfcontroller::participant::{DistControllerElectionFactory, LeadershipStateMachine};
use wolfcontroller::session::MemoryCoordinator;
use wolfcontroller::transition::{StateModel, TransitionDispatcher};

/// WolfController - Distributed Cluster Controller Participant
#[derive(Parser)]
#[command(name = "wolfcontroller")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfcontroller.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the participant
    Start,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfcontroller.toml")]
        output: PathBuf,

        /// Participant ID
        #[arg(long, default_value = "participant-1")]
        node_id: String,
    },

    /// Validate configuration file
    Validate,

    /// Query a running participant's status
    Status {
        /// API address to query
        #[arg(short, long, default_value = "localhost:8090")]
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = ControllerConfig::from_file(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    init_logging(&level, &logging.format);

    match cli.command {
        Commands::Start => run_start(cli.config).await,
        Commands::Init { output, node_id } => run_init(output, node_id),
        Commands::Validate => run_validate(cli.config),
        Commands::Status { address } => run_status(address).await,
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Start the participant
async fn run_start(config_path: PathBuf) -> Result<()> {
    tracing::info!("Starting WolfController participant...");

    let config = match ControllerConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration from {:?}: {}", config_path, e);
            return Err(e);
        }
    };
    tracing::info!("Loaded configuration for participant: {}", config.node.id);

    let coordinator = Arc::new(MemoryCoordinator::new(config.backend.address.clone()));
    let model = Arc::new(
        LeadershipStateMachine::new(
            config.backend.address.clone(),
            coordinator,
            Arc::new(DistControllerElectionFactory),
        )
        .with_connect_timeout(config.connect_timeout()),
    );

    let dispatcher = match TransitionDispatcher::new(Arc::clone(&model), &config.dispatcher) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            tracing::error!("Failed to build transition table for {}: {}", model.name(), e);
            return Err(e);
        }
    };
    for (from, to) in dispatcher.table().transitions() {
        tracing::debug!("Declared transition {} -> {}", from, to);
    }

    let http_server = HttpServer::new(
        config.api.clone(),
        config.node.id.clone(),
        Arc::clone(&dispatcher),
    );

    if config.api.enabled {
        tokio::select! {
            result = http_server.start() => {
                if let Err(e) = result {
                    tracing::error!("HTTP API stopped: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
            }
        }
    } else {
        tracing::warn!("HTTP API disabled, no transitions will be delivered");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received shutdown signal");
    }

    dispatcher.close().await;
    model.shutdown().await;

    tracing::info!("WolfController shutdown complete");
    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf, node_id: String) -> Result<()> {
    let config_content = format!(r#"# WolfController Configuration
# Generated configuration file

[node]
id = "{node_id}"

[backend]
address = "localhost:2181"
connect_timeout_ms = 30000

[dispatcher]
max_concurrent_transitions = 16

[api]
enabled = true
bind_address = "0.0.0.0:8090"

[logging]
level = "info"
format = "pretty"
"#);

    if output.exists() {
        return Err(Error::Config(format!(
            "{} already exists, refusing to overwrite",
            output.display()
        )));
    }

    std::fs::write(&output, config_content)?;
    println!("Configuration written to {}", output.display());
    Ok(())
}

/// Validate configuration file
fn run_validate(config_path: PathBuf) -> Result<()> {
    match ControllerConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Participant ID: {}", config.node.id);
            println!("  Backend: {}", config.backend.address);
            println!("  Connect Timeout: {:?}", config.connect_timeout());
            println!("  Max Concurrent Transitions: {}", config.dispatcher.max_concurrent_transitions);
            if config.api.enabled {
                println!("  API: {}", config.api.bind_address);
            } else {
                println!("  API: disabled");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Query participant status
async fn run_status(address: String) -> Result<()> {
    let url = format!("http://{}/status", address);

    match reqwest::get(&url).await {
        Ok(response) => {
            let status: serde_json::Value = response.json().await
                .map_err(|e| Error::Network(e.to_string()))?;
            let pretty = serde_json::to_string_pretty(&status)
                .map_err(|e| Error::Internal(e.to_string()))?;
            println!("{}", pretty);
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to get status: {}", e);
            Err(Error::Network(e.to_string()))
        }
    }
}
