//! Bridge binary entry point.
//!
//! Usage: ttn-frost-bridge <secrets.json> <routes.json>
//!
//! The process runs until terminated; Ctrl-C shuts it down cleanly.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use ttn_frost_bridge::{
    BridgeResult, Journal, RouteTable, Secrets, Settings, TokenManager, UplinkForwarder,
    UplinkSource,
};

/// Bridge TTN LoRaWAN GPS uplinks to an OGC SensorThings location sink.
#[derive(Parser, Debug)]
#[command(name = "ttn-frost-bridge")]
#[command(about = "Forwards TTN tracker uplinks to an OGC SensorThings API")]
struct Args {
    /// JSON document with TTN and Keycloak secrets.
    secrets: PathBuf,

    /// JSON document mapping device ids to sink URLs.
    routes: PathBuf,

    /// Path of the persisted refresh token.
    #[arg(long, env = "BRIDGE_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Directory for the diagnostic journal.
    #[arg(long, env = "BRIDGE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// MQTT broker host.
    #[arg(long, env = "BRIDGE_MQTT_HOST")]
    mqtt_host: Option<String>,

    /// MQTT broker port.
    #[arg(long, env = "BRIDGE_MQTT_PORT")]
    mqtt_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> BridgeResult<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("bridge starting...");

    // Defaults and env, then CLI overrides.
    let mut settings = Settings::new();
    if let Some(path) = args.token_file {
        settings.token_file = path;
    }
    if let Some(dir) = args.log_dir {
        settings.journal_dir = dir;
    }
    if let Some(host) = args.mqtt_host {
        settings.mqtt_host = host;
    }
    if let Some(port) = args.mqtt_port {
        settings.mqtt_port = port;
    }

    let secrets = Secrets::load(&args.secrets)?;
    let routes = RouteTable::load(&args.routes)?;
    info!(devices = routes.len(), "route table loaded");
    if routes.is_empty() {
        warn!("route table is empty, every uplink will be dropped");
    }

    let journal = Arc::new(Journal::new(settings.journal_dir.clone()));
    journal.append(&routes.dump());

    let tokens = match secrets.keycloak {
        Some(creds) => {
            let manager = TokenManager::bootstrap(creds, settings.token_file.clone()).await?;
            Some(Arc::new(manager))
        }
        None => {
            warn!("no Keycloak credentials configured, posting without authorization");
            None
        }
    };

    let forwarder = Arc::new(UplinkForwarder::new(routes, tokens, journal));
    let source = UplinkSource::new(&settings, &secrets.ttn);

    let ctrl_c = tokio::signal::ctrl_c();

    tokio::select! {
        result = source.run(forwarder) => {
            if let Err(e) = result {
                error!(error = %e, "ingestion loop exited with error");
                return Err(e);
            }
        }
        _ = ctrl_c => {
            info!("received shutdown signal, exiting...");
        }
    }

    Ok(())
}
