//! # tsdns-proxy
//!
//! DNS proxy that answers for selected zones with Tailscale overlay addresses
//! of the Kubernetes Services the upstream records point at.

mod bootstrap;
mod server;

use clap::Parser;
use mimalloc::MiMalloc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tsdns_proxy_domain::CliOverrides;
use tsdns_proxy_infrastructure::dns::DnsServerHandler;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "tsdns-proxy")]
#[command(version)]
#[command(about = "DNS proxy rewriting in-cluster answers to Tailscale addresses")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides config)
    #[arg(long)]
    level: Option<String>,

    /// Human-readable log output
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        listen_addr: cli.listen,
        log_level: cli.level,
        debug: cli.debug,
    };
    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config.logging);
    bootstrap::log_config(cli.config.as_deref(), &config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting tsdns-proxy");

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let resolver = bootstrap::start_resolver(&config.resolver, &shutdown).await?;
    let handler = DnsServerHandler::from_config(&config, resolver)?;

    if let Err(e) = server::start_dns_server(&config.proxy, handler, shutdown.clone()).await {
        error!(error = %e, "DNS server failed");
        shutdown.cancel();
        return Err(e);
    }

    shutdown.cancel();
    info!("tsdns-proxy stopped");
    Ok(())
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    wait_for_shutdown().await;
    info!("Shutdown signal received");
    shutdown.cancel();
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let terminate = signal::unix::signal(signal::unix::SignalKind::terminate());
        let interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt());
        match (terminate, interrupt) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Failed to register signal handlers, using ctrl-c only");
            }
        }
    }

    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
