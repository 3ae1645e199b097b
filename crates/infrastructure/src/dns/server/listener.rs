use super::handler::DnsServerHandler;
use hickory_server::ServerFuture;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tsdns_proxy_domain::DomainError;

const DEFAULT_TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// UDP and TCP listeners sharing one address and one handler.
pub struct DnsServer {
    udp: UdpSocket,
    tcp: TcpListener,
    handler: DnsServerHandler,
    tcp_idle_timeout: Duration,
    drain_timeout: Duration,
}

impl DnsServer {
    /// Binds both listeners. With port 0 the TCP listener takes the port the
    /// UDP socket was given. Must be called from within a Tokio runtime.
    pub fn bind(addr: SocketAddr, handler: DnsServerHandler) -> Result<Self, DomainError> {
        let udp = create_udp_socket(addr)
            .map_err(|e| DomainError::IoError(format!("failed to bind UDP {}: {}", addr, e)))?;
        let tcp_addr = match udp.local_addr() {
            Ok(bound) if addr.port() == 0 => bound,
            _ => addr,
        };
        let tcp = create_tcp_listener(tcp_addr).map_err(|e| {
            DomainError::IoError(format!("failed to bind TCP {}: {}", tcp_addr, e))
        })?;

        Ok(Self {
            udp,
            tcp,
            handler,
            tcp_idle_timeout: DEFAULT_TCP_IDLE_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        })
    }

    pub fn with_tcp_idle_timeout(mut self, timeout: Duration) -> Self {
        self.tcp_idle_timeout = timeout;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn udp_local_addr(&self) -> io::Result<SocketAddr> {
        self.udp.local_addr()
    }

    pub fn tcp_local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Serves until `shutdown` fires, then stops accepting and waits up to
    /// the drain timeout for in-flight queries before cancelling them.
    pub async fn run(self, shutdown: CancellationToken) {
        let in_flight = self.handler.in_flight();
        let mut server = ServerFuture::new(self.handler);
        server.register_socket(self.udp);
        server.register_listener(self.tcp, self.tcp_idle_timeout);

        tokio::select! {
            result = server.block_until_done() => {
                if let Err(e) = result {
                    warn!(error = %e, "DNS server stopped unexpectedly");
                }
                return;
            }
            _ = shutdown.cancelled() => {}
        }

        info!("Shutting down DNS server");
        let drained = tokio::time::timeout(self.drain_timeout, server.shutdown_gracefully()).await;
        match drained {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "DNS server shutdown failed"),
            Err(_) => {
                warn!("DNS server drain timed out, cancelling in-flight queries");
                in_flight.cancel();
                if let Err(e) = server.block_until_done().await {
                    warn!(error = %e, "DNS server shutdown failed");
                }
            }
        }
        info!("DNS server drained");
    }
}

fn create_udp_socket(socket_addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = Domain::for_address(socket_addr);
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

fn create_tcp_listener(socket_addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = Domain::for_address(socket_addr);
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
