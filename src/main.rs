//! Relaycast server binary.
//!
//! Settings come from `config/default.toml`, `RELAYCAST_*` environment
//! variables (a `.env` file is honoured) and finally the command line.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use relaycast::config::{Settings, load_config, normalize_path};
use relaycast::hub::Hub;
use relaycast::transport::start_websocket_server;
use relaycast::utils::{RelayError, logging};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "relaycast", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,
    /// Path that accepts WebSocket upgrades
    #[arg(long)]
    path: Option<String>,
    /// Log level: error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, mut settings: Settings) -> Settings {
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = self.path {
            settings.server.path = normalize_path(path);
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = match load_config().map_err(RelayError::from) {
        Ok(settings) => cli.apply(settings),
        Err(e) => {
            logging::init("info");
            error!(error = %e, "Failed to start");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&settings.logging.level);

    let hub = Arc::new(Hub::new());

    tokio::select! {
        result = start_websocket_server(&settings.server, hub) => {
            match result {
                Ok(()) => error!("WebSocket server exited unexpectedly"),
                Err(e) => error!(error = %e, "Server failed"),
            }
            ExitCode::FAILURE
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            ExitCode::SUCCESS
        }
    }
}
