use super::{io_error, timeout_error, DnsTransport, ExchangeTimeouts, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;
use tsdns_proxy_domain::DomainError;

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// DNS over UDP, one connected ephemeral socket per exchange.
pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    async fn connect(&self) -> Result<UdpSocket, DomainError> {
        let bind_addr: SocketAddr = if self.server_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| io_error(self.server_addr, "bind", e))?;
        socket
            .connect(self.server_addr)
            .await
            .map_err(|e| io_error(self.server_addr, "dial", e))?;
        Ok(socket)
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeouts: ExchangeTimeouts,
    ) -> Result<TransportResponse, DomainError> {
        let socket = tokio::time::timeout(timeouts.dial, self.connect())
            .await
            .map_err(|_| timeout_error(self.server_addr, "dial"))??;

        let bytes_sent = tokio::time::timeout(timeouts.write, socket.send(message_bytes))
            .await
            .map_err(|_| timeout_error(self.server_addr, "write"))?
            .map_err(|e| io_error(self.server_addr, "write", e))?;

        debug!(server = %self.server_addr, bytes_sent, "UDP query sent");

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let bytes_received = tokio::time::timeout(timeouts.read, socket.recv(&mut recv_buf))
            .await
            .map_err(|_| timeout_error(self.server_addr, "read"))?
            .map_err(|e| io_error(self.server_addr, "read", e))?;
        recv_buf.truncate(bytes_received);

        debug!(server = %self.server_addr, bytes_received, "UDP response received");

        Ok(TransportResponse {
            bytes: Bytes::from(recv_buf),
            server: self.server_addr,
        })
    }

    fn server(&self) -> SocketAddr {
        self.server_addr
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}
