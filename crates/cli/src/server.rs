use tokio_util::sync::CancellationToken;
use tracing::info;
use tsdns_proxy_domain::config::ProxyConfig;
use tsdns_proxy_infrastructure::dns::{DnsServer, DnsServerHandler};

pub async fn start_dns_server(
    config: &ProxyConfig,
    handler: DnsServerHandler,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let socket_addr = config.listen_socket_addr()?;

    info!(bind_address = %socket_addr, "Starting DNS server");

    let server =
        DnsServer::bind(socket_addr, handler)?.with_tcp_idle_timeout(config.tcp_idle_timeout());
    info!(protocol = "UDP", addr = %server.udp_local_addr()?, "DNS server listening");
    info!(protocol = "TCP", addr = %server.tcp_local_addr()?, "DNS server listening");

    server.run(shutdown).await;

    Ok(())
}
