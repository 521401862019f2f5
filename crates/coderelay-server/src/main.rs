//! coderelay server binary
//!
//! Loads provider credentials and gateway settings from the environment (and
//! optionally a YAML file), then serves the execution gateway over HTTP until
//! Ctrl+C or SIGTERM.

use anyhow::Result;
use clap::Parser;
use coderelay_core::config::{ConfigLoader, GatewayConfig};
use coderelay_core::ExecutionGateway;
use coderelay_server::{shutdown_signal, GatewayServer, ServerConfig};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "coderelay - remote code-execution gateway")]
struct Cli {
    #[clap(long, short, help = "Optional YAML configuration file (provider, retry, timeouts, languages)")]
    config: Option<String>,

    #[clap(long, default_value = "127.0.0.1:3001")]
    bind_addr: String,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, help = "Default deadline for one execution request, overriding the config file")]
    request_timeout_secs: Option<u64>,

    #[clap(long, default_value_t = 1024 * 1024, help = "Maximum request body size in bytes")]
    max_body_size: usize,

    #[clap(long, help = "Disable CORS headers")]
    no_cors: bool,

    #[clap(long, value_delimiter = ',', help = "Comma-separated list of allowed CORS origins")]
    cors_origins: Option<Vec<String>>,

    #[clap(long, help = "Never retry failed calls to the execution backend")]
    no_retry: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    run_server(cli).await
}

async fn load_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            log::info!("Loading configuration from file: {}", path);
            ConfigLoader::from_file(path).await?
        }
        None => {
            log::info!("Loading configuration from environment");
            ConfigLoader::from_env()?
        }
    };

    if let Some(secs) = cli.request_timeout_secs {
        config.timeouts.request_timeout_secs = secs;
    }
    if cli.no_retry {
        config.retry.enabled = false;
    }
    config.validate()?;

    log::debug!("Effective configuration: {:?}", config);
    Ok(config)
}

async fn run_server(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;
    let gateway = ExecutionGateway::from_config(&config)?;
    log::info!(
        "Execution gateway ready (backend: {}, languages: {}, configured: {})",
        gateway.backend_name(),
        gateway.resolver().len(),
        gateway.is_configured()
    );

    let mut server_config = ServerConfig::default()
        .with_bind_addr_str(&cli.bind_addr)?
        .with_cors(!cli.no_cors)
        .with_request_timeout(config.timeouts.request_timeout())
        .with_max_body_size(cli.max_body_size)
        .with_logging(true);
    if let Some(origins) = cli.cors_origins {
        server_config = server_config.with_cors_origins(origins);
    }

    let server = GatewayServer::with_config(gateway, server_config);

    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
