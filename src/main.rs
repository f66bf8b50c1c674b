//! Deskpilot control server - main entry point.
//!
//! Loads configuration (TOML file, then environment, then flags), wires the
//! tool invoker, gateway tracker and health aggregator, and serves the HTTP
//! API until Ctrl-C.

use clap::Parser;
use deskpilot_core::api::{ApiServer, AppState};
use deskpilot_core::Config;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "deskpilot", version, about = "Desktop agent control core")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "DESKPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP bind address (overrides config and environment).
    #[arg(long)]
    listen: Option<String>,

    /// Tool gateway base URL (overrides config and environment).
    #[arg(long)]
    gateway_url: Option<String>,

    /// Print the configuration JSON schema and exit.
    #[arg(long)]
    print_config_schema: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.print_config_schema {
        println!("{}", serde_json::to_string_pretty(&Config::json_schema())?);
        return Ok(());
    }

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(url) = cli.gateway_url {
        config.gateway.base_url = url;
    }

    // Initialize observability
    deskpilot_core::observability::init_tracing(&config.observability);

    let addr: SocketAddr = config.server.listen_addr.parse()?;
    let state = AppState::from_config(&config)?;
    {
        let control = state.invoker.control().lock().await;
        tracing::info!(
            tools = control.registry().len(),
            enabled = control.registry().enabled_count(),
            gateway = %config.gateway.base_url,
            "tool registry loaded"
        );
    }

    let server = ApiServer::new(state, config.server.permissive_cors);
    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            cancel.cancel();
        }
    });

    server.serve(addr).await?;
    Ok(())
}
